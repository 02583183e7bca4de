//! Tables: collections that persist across ticks.

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::collections::{
    merge_tuple, CollectionInfo, CollectionKind, CollectionTupleIds, Scannable,
};
use crate::error::Result;
use crate::lineage::{CollectionSpec, LineageSink};
use crate::row::Row;

/// A table persists for the node's lifetime. Merges land immediately;
/// deferred merges and deferred deletes queue into side maps that are applied
/// when the table ticks, which is what gives deferred writes their
/// end-of-tick visibility.
#[derive(Clone)]
pub struct Table<R: Row> {
    inner: Rc<RefCell<TableInner<R>>>,
}

struct TableInner<R: Row> {
    name: String,
    column_names: Vec<String>,
    rows: BTreeMap<R, CollectionTupleIds>,
    deferred_merge: BTreeMap<R, CollectionTupleIds>,
    deferred_delete: BTreeMap<R, CollectionTupleIds>,
}

impl<R: Row> Table<R> {
    pub(crate) fn new(name: &str, column_names: Vec<String>) -> Self {
        Table {
            inner: Rc::new(RefCell::new(TableInner {
                name: name.to_string(),
                column_names,
                rows: BTreeMap::new(),
                deferred_merge: BTreeMap::new(),
                deferred_delete: BTreeMap::new(),
            })),
        }
    }

    /// The table's name.
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

    /// Queues an insertion applied at the next tick.
    pub fn deferred_merge(&self, row: R, hash: u64, time: u64) {
        merge_tuple(&mut self.inner.borrow_mut().deferred_merge, row, hash, time);
    }

    /// Queues a deletion applied at the next tick.
    pub fn deferred_delete(&self, row: R, hash: u64, time: u64) {
        merge_tuple(&mut self.inner.borrow_mut().deferred_delete, row, hash, time);
    }

    /// Applies pending deferred writes and returns the tuples removed.
    pub fn tick(&self) -> BTreeMap<R, CollectionTupleIds> {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;

        let deferred_merge = std::mem::take(&mut inner.deferred_merge);
        for (row, ids) in deferred_merge {
            match inner.rows.entry(row) {
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(ids);
                }
                std::collections::btree_map::Entry::Occupied(mut entry) => {
                    assert_eq!(
                        entry.get().hash,
                        ids.hash,
                        "tuple {:?} recorded with two distinct hashes",
                        entry.key()
                    );
                    entry.get_mut().times.extend(ids.times);
                }
            }
        }

        let mut deleted = BTreeMap::new();
        let deferred_delete = std::mem::take(&mut inner.deferred_delete);
        for (row, ids) in deferred_delete {
            if let Some(existing) = inner.rows.remove(&row) {
                assert_eq!(
                    existing.hash, ids.hash,
                    "tuple {:?} recorded with two distinct hashes",
                    row
                );
                deleted.insert(row, existing);
            }
        }
        deleted
    }
}

impl<R: Row> Scannable for Table<R> {
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

impl<R: Row> CollectionInfo for Table<R> {
    fn spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.name(),
            kind: CollectionKind::Table,
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

    fn table() -> Table<(i64,)> {
        Table::new("t", vec!["x".to_string()])
    }

    #[test]
    fn merge_is_immediately_visible() {
        let t = table();
        t.merge((1,), (1i64,).hashed(), 0);
        t.merge((2,), (2i64,).hashed(), 0);
        assert_eq!(t.rows(), vec![(1,), (2,)]);
    }

    #[test]
    fn merging_twice_accumulates_times() {
        let t = table();
        let hash = (1i64,).hashed();
        t.merge((1,), hash, 3);
        t.merge((1,), hash, 7);
        let ids = t.get()[&(1,)].clone();
        assert_eq!(ids.hash, hash);
        assert_eq!(ids.times.into_iter().collect::<Vec<_>>(), vec![3, 7]);
    }

    #[test]
    fn deferred_merge_lands_at_tick() {
        let t = table();
        t.deferred_merge((1,), (1i64,).hashed(), 2);
        assert_eq!(t.rows(), vec![]);
        let deleted = t.tick();
        assert!(deleted.is_empty());
        assert_eq!(t.rows(), vec![(1,)]);
    }

    #[test]
    fn deferred_delete_removes_at_tick() {
        let t = table();
        let hash = (1i64,).hashed();
        t.merge((1,), hash, 1);
        t.deferred_delete((1,), hash, 2);
        assert_eq!(t.rows(), vec![(1,)]);
        let deleted = t.tick();
        assert_eq!(deleted.into_keys().collect::<Vec<_>>(), vec![(1,)]);
        assert_eq!(t.rows(), vec![]);
    }

    #[test]
    fn deleting_an_absent_tuple_does_nothing() {
        let t = table();
        t.deferred_delete((9,), (9i64,).hashed(), 1);
        assert!(t.tick().is_empty());
    }

    #[test]
    #[should_panic(expected = "distinct hashes")]
    fn conflicting_hashes_abort() {
        let t = table();
        t.merge((1,), 100, 0);
        t.merge((1,), 200, 1);
    }
}
