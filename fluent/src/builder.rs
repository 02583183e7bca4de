//! Assembling a node: declare collections, register rules, build.
//!
//! Each declaration returns a typed handle: a cheap clone over the
//! collection's shared state. Rules are built by calling a handle's rule
//! constructors over pipelines that capture other handles, then installed
//! with [`FluentBuilder::register_rules`] (or the bootstrap variant), and
//! [`FluentBuilder::build`] announces everything to the lineage sink and
//! hands back the runnable executor.
//!
//! ```no_run
//! use fluent::fluent;
//! use fluent::lineage::NoopSink;
//! use fluent::ra::{collection, Pipeline};
//!
//! let context = zmq::Context::new();
//! let mut builder = fluent(
//!     "example",
//!     0,
//!     "tcp://*:8000",
//!     &context,
//!     Box::<NoopSink>::default(),
//! ).unwrap();
//!
//! let t = builder.table::<(i64, String)>("t", &["x", "name"]).unwrap();
//! let s = builder.scratch::<(i64, String)>("s", &["x", "name"]).unwrap();
//! builder.register_rules(vec![s.merge_rule(collection(&t))]);
//! let mut node = builder.build().unwrap();
//! node.run().unwrap();
//! ```

use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::clock::{Clock, SystemClock};
use crate::collections::{Channel, Periodic, Scratch, Stdin, Stdout, Table};
use crate::error::{Error, Result};
use crate::executor::{FluentExecutor, Parser};
use crate::hashable::Hashable;
use crate::lineage::LineageSink;
use crate::net::NetworkState;
use crate::row::{AddressedRow, Row};
use crate::rule::Rule;

/// Starts building a node named `name` with id `id`, listening for channel
/// messages on `address`. The sink is the capability every tuple, deletion,
/// and derivation will be recorded through.
pub fn fluent(
    name: &str,
    id: u64,
    address: &str,
    context: &zmq::Context,
    sink: Box<dyn LineageSink>,
) -> Result<FluentBuilder> {
    Ok(FluentBuilder {
        name: name.to_string(),
        id,
        network: NetworkState::new(context, address)?,
        collections: Vec::new(),
        names: BTreeSet::new(),
        parsers: HashMap::new(),
        stdin: None,
        periodics: Vec::new(),
        bootstrap_rules: Vec::new(),
        rules: Vec::new(),
        sink,
        clock: Box::new(SystemClock),
    })
}

/// See [`fluent`].
pub struct FluentBuilder {
    name: String,
    id: u64,
    network: NetworkState,
    collections: Vec<Box<dyn crate::collections::CollectionInfo>>,
    names: BTreeSet<String>,
    parsers: HashMap<String, Parser>,
    stdin: Option<Stdin>,
    periodics: Vec<Periodic>,
    bootstrap_rules: Vec<Rule>,
    rules: Vec<Rule>,
    sink: Box<dyn LineageSink>,
    clock: Box<dyn Clock>,
}

impl FluentBuilder {
    fn declare(&mut self, name: &str, declared: usize, arity: usize) -> Result<()> {
        if declared != arity {
            return Err(Error::Config(format!(
                "collection '{}' declares {} column names but its row type has {} columns",
                name, declared, arity
            )));
        }
        if !self.names.insert(name.to_string()) {
            return Err(Error::Config(format!(
                "the collection name '{}' is used multiple times; collection names must be unique",
                name
            )));
        }
        Ok(())
    }

    /// Declares a table.
    pub fn table<R: Row>(&mut self, name: &str, columns: &[&str]) -> Result<Table<R>> {
        self.declare(name, columns.len(), R::ARITY)?;
        tracing::info!(name, "adding a table");
        let handle = Table::new(name, columns.iter().map(|c| c.to_string()).collect());
        self.collections.push(Box::new(handle.clone()));
        Ok(handle)
    }

    /// Declares a scratch.
    pub fn scratch<R: Row>(&mut self, name: &str, columns: &[&str]) -> Result<Scratch<R>> {
        self.declare(name, columns.len(), R::ARITY)?;
        tracing::info!(name, "adding a scratch");
        let handle = Scratch::new(name, columns.iter().map(|c| c.to_string()).collect());
        self.collections.push(Box::new(handle.clone()));
        Ok(handle)
    }

    /// Declares a channel. The row type's first column is the address the
    /// tuple is sent to; inbound messages naming this channel are parsed
    /// into `R` and land here for one tick.
    pub fn channel<R: AddressedRow>(&mut self, name: &str, columns: &[&str]) -> Result<Channel<R>> {
        self.declare(name, columns.len(), R::ARITY)?;
        tracing::info!(name, "adding a channel");
        let handle = Channel::<R>::new(
            self.id,
            name,
            columns.iter().map(|c| c.to_string()).collect(),
            self.network.cache.clone(),
        );

        let parser_handle = handle.clone();
        let channel_name = name.to_string();
        let parser: Parser = Box::new(
            move |sink: &mut dyn LineageSink,
                  source_node: u64,
                  source_time: u64,
                  frames: &[String],
                  time: u64| {
                let row = match R::decode_columns(frames) {
                    Ok(row) => row,
                    Err(error) => {
                        tracing::warn!(channel = %channel_name, %error, "dropping undecodable channel tuple");
                        return Ok(());
                    }
                };
                let hash = row.hashed();
                parser_handle.receive(row.clone(), hash, time);
                sink.insert_tuple(&channel_name, hash, time, &row.sql_values())?;
                sink.add_networked_lineage(source_node, source_time, &channel_name, hash, time)?;
                Ok(())
            },
        );
        self.parsers.insert(name.to_string(), parser);

        self.collections.push(Box::new(handle.clone()));
        Ok(handle)
    }

    /// Declares the stdin collection: the receive phase will poll the
    /// terminal and insert each line.
    pub fn stdin(&mut self) -> Result<Stdin> {
        self.declare("stdin", 1, 1)?;
        tracing::info!("adding stdin");
        let handle = Stdin::new();
        self.stdin = Some(handle.clone());
        self.collections.push(Box::new(handle.clone()));
        Ok(handle)
    }

    /// Declares the stdout collection.
    pub fn stdout(&mut self) -> Result<Stdout> {
        self.declare("stdout", 1, 1)?;
        tracing::info!("adding stdout");
        let handle = Stdout::new();
        self.collections.push(Box::new(handle.clone()));
        Ok(handle)
    }

    /// Declares a periodic with the given period. The scheduler inserts a
    /// `(unique id, now)` tuple every time the period elapses; rules cannot
    /// write into it.
    pub fn periodic(&mut self, name: &str, period: std::time::Duration) -> Result<Periodic> {
        self.declare(name, 2, 2)?;
        tracing::info!(name, ?period, "adding a periodic");
        let handle = Periodic::new(name, period);
        self.periodics.push(handle.clone());
        self.collections.push(Box::new(handle.clone()));
        Ok(handle)
    }

    /// Registers the bootstrap rules, executed once before the main loop in
    /// the order given.
    pub fn register_bootstrap_rules(&mut self, rules: Vec<Rule>) {
        self.bootstrap_rules.extend(rules);
    }

    /// Registers the steady-state rules, executed every tick in the order
    /// given.
    pub fn register_rules(&mut self, rules: Vec<Rule>) {
        self.rules.extend(rules);
    }

    /// Replaces the clock the periodic scheduler reads. Tests pair this with
    /// [`MockClock`](crate::clock::MockClock).
    pub fn with_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    /// Announces the node to the lineage sink and hands back the runnable
    /// executor. Sink failures here are fatal: the node never starts.
    pub fn build(mut self) -> Result<FluentExecutor> {
        self.sink.init()?;
        for collection in self.collections.iter() {
            self.sink.add_collection(&collection.spec())?;
        }
        for (rule_id, rule) in self.bootstrap_rules.iter().enumerate() {
            self.sink.add_rule(rule_id, true, rule.text())?;
        }
        for (rule_id, rule) in self.rules.iter().enumerate() {
            self.sink.add_rule(rule_id, false, rule.text())?;
        }

        let mut executor = FluentExecutor {
            name: self.name,
            id: self.id,
            time: 0,
            collections: self.collections,
            bootstrap_rules: self.bootstrap_rules,
            rules: self.rules,
            parsers: self.parsers,
            network: self.network,
            stdin: self.stdin,
            periodics: self.periodics,
            deadlines: BinaryHeap::new(),
            sink: self.sink,
            clock: self.clock,
        };
        executor.schedule_periodics();
        Ok(executor)
    }
}
