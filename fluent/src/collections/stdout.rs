//! Stdout as a single-column print sink.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::collections::{CollectionInfo, CollectionKind};
use crate::error::Result;
use crate::lineage::{CollectionSpec, LineageSink};
use crate::row::Row;

/// Terminal output. Merge prints the single string column immediately;
/// deferred merge buffers the line and prints it when the collection ticks.
/// Nothing is ever retained past the tick, so rules cannot read stdout.
#[derive(Clone)]
pub struct Stdout {
    deferred: Rc<RefCell<BTreeSet<(String,)>>>,
}

impl Stdout {
    pub(crate) fn new() -> Self {
        Stdout {
            deferred: Rc::new(RefCell::new(BTreeSet::new())),
        }
    }

    /// The collection's name. There is one stdout per node.
    pub fn name(&self) -> String {
        "stdout".to_string()
    }

    /// The single column name.
    pub fn column_names(&self) -> Vec<String> {
        vec!["stdout".to_string()]
    }

    /// The lines waiting to be printed at the next tick, for inspection.
    pub fn pending(&self) -> Vec<(String,)> {
        self.deferred.borrow().iter().cloned().collect()
    }

    /// Prints the line immediately.
    pub fn merge(&self, row: (String,), _hash: u64, _time: u64) {
        println!("{}", row.0);
    }

    /// Buffers the line for printing when the collection ticks.
    pub fn deferred_merge(&self, row: (String,), _hash: u64, _time: u64) {
        self.deferred.borrow_mut().insert(row);
    }

    /// Prints and drops the buffered lines.
    pub fn tick(&self) {
        for row in std::mem::take(&mut *self.deferred.borrow_mut()) {
            println!("{}", row.0);
        }
    }
}

impl CollectionInfo for Stdout {
    fn spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.name(),
            kind: CollectionKind::Stdout,
            column_names: self.column_names(),
            column_types: <(String,)>::sql_types(),
        }
    }

    fn tick_collection(&self, _sink: &mut dyn LineageSink, _time: u64) -> Result<()> {
        // Deletions for printed lines were already recorded when the rule
        // fired; the tick only flushes the deferred buffer.
        self.tick();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_lines_wait_for_the_tick() {
        let out = Stdout::new();
        out.deferred_merge(("hello".to_string(),), 0, 0);
        out.deferred_merge(("world".to_string(),), 0, 0);
        assert_eq!(
            out.pending(),
            vec![("hello".to_string(),), ("world".to_string(),)]
        );
        out.tick();
        assert_eq!(out.pending(), vec![]);
    }
}
