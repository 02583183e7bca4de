//! Fluent is an embedded distributed-dataflow runtime with data lineage.
//!
//! A Fluent program describes one process (a *node*) as a set of typed
//! collections related by rules drawn from relational algebra. Once per tick
//! the runtime fires every rule in registration order, ships channel tuples to
//! other nodes over ZeroMQ, clears transient collections, and records every
//! tuple it ever produced, along with its causal derivation, into a lineage
//! store so that the provenance of any output can be reconstructed by query.
//!
//! Collections come in six kinds, each with its own write and tick semantics:
//! tables persist, scratches last for one tick, channels send their tuples to
//! the address in their first column, stdin and stdout bridge the terminal,
//! and periodics are written by the scheduler on a timer. Rules pair a target
//! collection and a write mode (merge, deferred merge, deferred delete) with a
//! lazy pipeline built from `map`, `filter`, `project!`, `cross`, hash joins,
//! and grouped aggregation.
//!
//! # Examples
//!
//! A node that counts its own ticks:
//!
//! ```no_run
//! use fluent::fluent;
//! use fluent::lineage::NoopSink;
//! use fluent::ra::{collection, Pipeline};
//!
//! let context = zmq::Context::new();
//! let mut builder = fluent(
//!     "counter",
//!     0,
//!     "tcp://*:8000",
//!     &context,
//!     Box::<NoopSink>::default(),
//! ).unwrap();
//!
//! let t = builder.table::<(u64,)>("t", &["x"]).unwrap();
//! builder.register_rules(vec![t.merge_rule(collection(&t).count())]);
//!
//! let mut node = builder.build().unwrap();
//! node.tick().unwrap();   // t = {0}
//! node.tick().unwrap();   // t = {0, 1}
//! ```

pub mod builder;
pub mod clock;
pub mod collections;
pub mod error;
pub mod executor;
pub mod hashable;
pub mod lineage;
pub(crate) mod net;
pub mod ra;
pub mod row;
pub mod rule;

pub use builder::{fluent, FluentBuilder};
pub use error::{Error, Result};
pub use executor::FluentExecutor;
pub use hashable::Hashable;
pub use row::{AddressedRow, Column, Concat, Row, SqlValue, TimePoint};
pub use rule::{Rule, RuleTag};
