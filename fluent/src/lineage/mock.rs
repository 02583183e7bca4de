//! A sink that records every call, for tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;
use crate::lineage::{CollectionSpec, LineageSink};
use crate::row::SqlValue;

/// One recorded `insert_tuple` or `delete_tuple` call.
#[derive(Clone, Debug, PartialEq)]
pub struct TupleEvent {
    pub collection: String,
    pub hash: u64,
    pub time: u64,
    pub values: Vec<SqlValue>,
}

/// One recorded `add_derived_lineage` call.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedEvent {
    pub source: String,
    pub source_hash: u64,
    pub rule_id: usize,
    pub inserted: bool,
    pub target: String,
    pub target_hash: u64,
    pub time: u64,
}

/// One recorded `add_networked_lineage` call.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkedEvent {
    pub source_node: u64,
    pub source_time: u64,
    pub target: String,
    pub target_hash: u64,
    pub time: u64,
}

#[derive(Default)]
struct MockState {
    init_count: usize,
    collections: Vec<CollectionSpec>,
    rules: Vec<(usize, bool, String)>,
    inserts: Vec<TupleEvent>,
    deletes: Vec<TupleEvent>,
    derived: Vec<DerivedEvent>,
    networked: Vec<NetworkedEvent>,
    execs: Vec<String>,
}

/// Records every sink call in shared state. Clone the sink before handing it
/// to the builder and keep the clone around to assert on what the node
/// recorded.
#[derive(Clone, Default)]
pub struct MockSink {
    state: Rc<RefCell<MockState>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `init` ran. Should be one.
    pub fn init_count(&self) -> usize {
        self.state.borrow().init_count
    }

    /// Every announced collection, in declaration order.
    pub fn collections(&self) -> Vec<CollectionSpec> {
        self.state.borrow().collections.clone()
    }

    /// Every announced rule as `(rule_id, is_bootstrap, text)`.
    pub fn rules(&self) -> Vec<(usize, bool, String)> {
        self.state.borrow().rules.clone()
    }

    /// Every recorded insertion, in order.
    pub fn inserts(&self) -> Vec<TupleEvent> {
        self.state.borrow().inserts.clone()
    }

    /// Every recorded deletion, in order.
    pub fn deletes(&self) -> Vec<TupleEvent> {
        self.state.borrow().deletes.clone()
    }

    /// Every recorded derived-lineage edge, in order.
    pub fn derived(&self) -> Vec<DerivedEvent> {
        self.state.borrow().derived.clone()
    }

    /// Every recorded networked-lineage edge, in order.
    pub fn networked(&self) -> Vec<NetworkedEvent> {
        self.state.borrow().networked.clone()
    }

    /// Every statement passed to `exec`, in order.
    pub fn execs(&self) -> Vec<String> {
        self.state.borrow().execs.clone()
    }
}

impl LineageSink for MockSink {
    fn init(&mut self) -> Result<()> {
        self.state.borrow_mut().init_count += 1;
        Ok(())
    }

    fn add_collection(&mut self, spec: &CollectionSpec) -> Result<()> {
        self.state.borrow_mut().collections.push(spec.clone());
        Ok(())
    }

    fn add_rule(&mut self, rule_id: usize, is_bootstrap: bool, text: &str) -> Result<()> {
        self.state
            .borrow_mut()
            .rules
            .push((rule_id, is_bootstrap, text.to_string()));
        Ok(())
    }

    fn insert_tuple(
        &mut self,
        collection: &str,
        hash: u64,
        time: u64,
        values: &[SqlValue],
    ) -> Result<()> {
        self.state.borrow_mut().inserts.push(TupleEvent {
            collection: collection.to_string(),
            hash,
            time,
            values: values.to_vec(),
        });
        Ok(())
    }

    fn delete_tuple(
        &mut self,
        collection: &str,
        hash: u64,
        time: u64,
        values: &[SqlValue],
    ) -> Result<()> {
        self.state.borrow_mut().deletes.push(TupleEvent {
            collection: collection.to_string(),
            hash,
            time,
            values: values.to_vec(),
        });
        Ok(())
    }

    fn add_derived_lineage(
        &mut self,
        source: &str,
        source_hash: u64,
        rule_id: usize,
        inserted: bool,
        target: &str,
        target_hash: u64,
        time: u64,
    ) -> Result<()> {
        self.state.borrow_mut().derived.push(DerivedEvent {
            source: source.to_string(),
            source_hash,
            rule_id,
            inserted,
            target: target.to_string(),
            target_hash,
            time,
        });
        Ok(())
    }

    fn add_networked_lineage(
        &mut self,
        source_node: u64,
        source_time: u64,
        target: &str,
        target_hash: u64,
        time: u64,
    ) -> Result<()> {
        self.state.borrow_mut().networked.push(NetworkedEvent {
            source_node,
            source_time,
            target: target.to_string(),
            target_hash,
            time,
        });
        Ok(())
    }

    fn exec(&mut self, sql: &str) -> Result<()> {
        self.state.borrow_mut().execs.push(sql.to_string());
        Ok(())
    }
}
