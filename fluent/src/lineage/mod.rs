//! The lineage sink: where every tuple and derivation is recorded.
//!
//! A node announces its collections and rules once at startup, then reports
//! every insertion, every deletion, every derived-lineage edge (a rule firing
//! producing a tuple from sources), and every networked-lineage edge (a
//! channel tuple arriving from a remote node). The sink is a capability
//! passed into the builder; nothing in the core assumes any particular
//! store. Three variants ship with the crate: [`NoopSink`] discards
//! everything, [`MockSink`] records every call for test assertions, and
//! [`PostgresSink`] writes the relational schema the lineage queries run
//! against.

use serde::{Deserialize, Serialize};

use crate::collections::CollectionKind;
use crate::error::Result;
use crate::row::SqlValue;

mod mock;
mod noop;
mod postgres;

pub use mock::{DerivedEvent, MockSink, NetworkedEvent, TupleEvent};
pub use noop::NoopSink;
pub use postgres::PostgresSink;

/// A collection declaration, as announced to the sink at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionSpec {
    /// The collection's name, unique within the node.
    pub name: String,
    /// Which of the six kinds it is.
    pub kind: CollectionKind,
    /// The declared column names.
    pub column_names: Vec<String>,
    /// The SQL type of each column.
    pub column_types: Vec<String>,
}

/// The narrow interface the runtime records through.
///
/// Startup-time failures (from `init` through the `add_*` announcements) are
/// fatal; steady-state failures surface as the status result of `tick`,
/// `receive`, and `run`, and the caller decides whether to abort.
pub trait LineageSink {
    /// Called once at node startup, before any other call.
    fn init(&mut self) -> Result<()>;

    /// Announces one collection. Called once per collection at startup.
    fn add_collection(&mut self, spec: &CollectionSpec) -> Result<()>;

    /// Announces one rule. Bootstrap and steady rules number separately.
    fn add_rule(&mut self, rule_id: usize, is_bootstrap: bool, text: &str) -> Result<()>;

    /// Records a tuple entering a collection at a logical time.
    fn insert_tuple(
        &mut self,
        collection: &str,
        hash: u64,
        time: u64,
        values: &[SqlValue],
    ) -> Result<()>;

    /// Records a tuple leaving a collection at a logical time.
    fn delete_tuple(
        &mut self,
        collection: &str,
        hash: u64,
        time: u64,
        values: &[SqlValue],
    ) -> Result<()>;

    /// Records that rule `rule_id` derived the target tuple from the source
    /// tuple. One edge per contributing source occurrence.
    #[allow(clippy::too_many_arguments)]
    fn add_derived_lineage(
        &mut self,
        source: &str,
        source_hash: u64,
        rule_id: usize,
        inserted: bool,
        target: &str,
        target_hash: u64,
        time: u64,
    ) -> Result<()>;

    /// Records that a channel tuple arrived from a remote node.
    fn add_networked_lineage(
        &mut self,
        source_node: u64,
        source_time: u64,
        target: &str,
        target_hash: u64,
        time: u64,
    ) -> Result<()>;

    /// Runs a raw statement against the store. Black-box lineage
    /// registration installs its stored procedures through this.
    fn exec(&mut self, sql: &str) -> Result<()>;
}

/// Connection parameters for a relational lineage store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl ConnectionConfig {
    /// Renders the config as a `key=value` connection string.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            self.host, self.port, self.user, self.password, self.dbname
        )
    }
}
