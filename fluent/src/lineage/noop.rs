//! A sink that records nothing.

use crate::error::Result;
use crate::lineage::{CollectionSpec, LineageSink};
use crate::row::SqlValue;

/// Discards every call. Use it when you do not care about history or
/// lineage, or in unit tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LineageSink for NoopSink {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn add_collection(&mut self, _spec: &CollectionSpec) -> Result<()> {
        Ok(())
    }

    fn add_rule(&mut self, _rule_id: usize, _is_bootstrap: bool, _text: &str) -> Result<()> {
        Ok(())
    }

    fn insert_tuple(
        &mut self,
        _collection: &str,
        _hash: u64,
        _time: u64,
        _values: &[SqlValue],
    ) -> Result<()> {
        Ok(())
    }

    fn delete_tuple(
        &mut self,
        _collection: &str,
        _hash: u64,
        _time: u64,
        _values: &[SqlValue],
    ) -> Result<()> {
        Ok(())
    }

    fn add_derived_lineage(
        &mut self,
        _source: &str,
        _source_hash: u64,
        _rule_id: usize,
        _inserted: bool,
        _target: &str,
        _target_hash: u64,
        _time: u64,
    ) -> Result<()> {
        Ok(())
    }

    fn add_networked_lineage(
        &mut self,
        _source_node: u64,
        _source_time: u64,
        _target: &str,
        _target_hash: u64,
        _time: u64,
    ) -> Result<()> {
        Ok(())
    }

    fn exec(&mut self, _sql: &str) -> Result<()> {
        Ok(())
    }
}
