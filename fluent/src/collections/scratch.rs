//! Scratches: collections cleared at the end of every tick.

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::collections::{
    merge_tuple, CollectionInfo, CollectionKind, CollectionTupleIds, Scannable,
};
use crate::error::Result;
use crate::lineage::{CollectionSpec, LineageSink};
use crate::row::Row;

/// A scratch holds tuples for a single tick. It accepts only merge; deferred
/// writes into a collection that is about to be cleared would be wasted work.
#[derive(Clone)]
pub struct Scratch<R: Row> {
    inner: Rc<RefCell<ScratchInner<R>>>,
}

struct ScratchInner<R: Row> {
    name: String,
    column_names: Vec<String>,
    rows: BTreeMap<R, CollectionTupleIds>,
}

impl<R: Row> Scratch<R> {
    pub(crate) fn new(name: &str, column_names: Vec<String>) -> Self {
        Scratch {
            inner: Rc::new(RefCell::new(ScratchInner {
                name: name.to_string(),
                column_names,
                rows: BTreeMap::new(),
            })),
        }
    }

    /// The scratch's name.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// The declared column names.
    pub fn column_names(&self) -> Vec<String> {
        self.inner.borrow().column_names.clone()
    }

    /// The live contents.
    pub fn get(&self) -> Ref<'_, BTreeMap<R, CollectionTupleIds>> {
        Ref::map(self.inner.borrow(), |inner| &inner.rows)
    }

    /// The live tuples, sorted by value.
    pub fn rows(&self) -> Vec<R> {
        self.inner.borrow().rows.keys().cloned().collect()
    }

    /// Inserts into the live map immediately.
    pub fn merge(&self, row: R, hash: u64, time: u64) {
        merge_tuple(&mut self.inner.borrow_mut().rows, row, hash, time);
    }

    /// Empties the scratch, returning everything it held.
    pub fn tick(&self) -> BTreeMap<R, CollectionTupleIds> {
        std::mem::take(&mut self.inner.borrow_mut().rows)
    }
}

impl<R: Row> Scannable for Scratch<R> {
    type Row = R;
    fn scan_name(&self) -> String {
        self.name()
    }
    fn scan(&self) -> Vec<(R, CollectionTupleIds)> {
        self.inner
            .borrow()
            .rows
            .iter()
            .map(|(row, ids)| (row.clone(), ids.clone()))
            .collect()
    }
}

impl<R: Row> CollectionInfo for Scratch<R> {
    fn spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.name(),
            kind: CollectionKind::Scratch,
            column_names: self.column_names(),
            column_types: R::sql_types(),
        }
    }

    fn tick_collection(&self, sink: &mut dyn LineageSink, time: u64) -> Result<()> {
        let name = self.name();
        for (row, ids) in self.tick() {
            sink.delete_tuple(&name, ids.hash, time, &row.sql_values())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashable::Hashable;

    #[test]
    fn tick_clears_and_returns_contents() {
        let s: Scratch<(i64,)> = Scratch::new("s", vec!["x".to_string()]);
        s.merge((1,), (1i64,).hashed(), 0);
        s.merge((2,), (2i64,).hashed(), 0);
        assert_eq!(s.rows(), vec![(1,), (2,)]);

        let removed = s.tick();
        assert_eq!(removed.into_keys().collect::<Vec<_>>(), vec![(1,), (2,)]);
        assert_eq!(s.rows(), vec![]);
    }
}
