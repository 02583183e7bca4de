//! Periodics: timer-driven collections written by the scheduler.

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use crate::collections::{
    merge_tuple, CollectionInfo, CollectionKind, CollectionTupleIds, Scannable,
};
use crate::error::Result;
use crate::lineage::{CollectionSpec, LineageSink};
use crate::row::{Row, TimePoint};

/// A periodic is a two-column collection `(id, time)`. Rules cannot write
/// into it. Instead, it is constructed with a period; every time the period
/// elapses, the scheduler inserts a tuple carrying a fresh monotonic id and
/// the current wall-clock time. Like a scratch, it is cleared every tick.
#[derive(Clone)]
pub struct Periodic {
    inner: Rc<RefCell<PeriodicInner>>,
}

struct PeriodicInner {
    name: String,
    period: Duration,
    counter: u64,
    rows: BTreeMap<(u64, TimePoint), CollectionTupleIds>,
}

impl Periodic {
    pub(crate) fn new(name: &str, period: Duration) -> Self {
        Periodic {
            inner: Rc::new(RefCell::new(PeriodicInner {
                name: name.to_string(),
                period,
                counter: 0,
                rows: BTreeMap::new(),
            })),
        }
    }

    /// The periodic's name.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// The fixed column names.
    pub fn column_names(&self) -> Vec<String> {
        vec!["id".to_string(), "time".to_string()]
    }

    /// How often the scheduler fires this periodic.
    pub fn period(&self) -> Duration {
        self.inner.borrow().period
    }

    /// The firings of the current tick.
    pub fn get(&self) -> Ref<'_, BTreeMap<(u64, TimePoint), CollectionTupleIds>> {
        Ref::map(self.inner.borrow(), |inner| &inner.rows)
    }

    /// The firings of the current tick, sorted.
    pub fn rows(&self) -> Vec<(u64, TimePoint)> {
        self.inner.borrow().rows.keys().cloned().collect()
    }

    /// Hands out the next unique id.
    pub fn get_and_increment_id(&self) -> u64 {
        let mut inner = self.inner.borrow_mut();
        let id = inner.counter;
        inner.counter += 1;
        id
    }

    /// Inserts a firing. Called by the scheduler, never by rules.
    pub fn merge(&self, row: (u64, TimePoint), hash: u64, time: u64) {
        merge_tuple(&mut self.inner.borrow_mut().rows, row, hash, time);
    }

    /// Empties the periodic, returning the firings it held.
    pub fn tick(&self) -> BTreeMap<(u64, TimePoint), CollectionTupleIds> {
        std::mem::take(&mut self.inner.borrow_mut().rows)
    }
}

impl Scannable for Periodic {
    type Row = (u64, TimePoint);
    fn scan_name(&self) -> String {
        self.name()
    }
    fn scan(&self) -> Vec<((u64, TimePoint), CollectionTupleIds)> {
        self.inner
            .borrow()
            .rows
            .iter()
            .map(|(row, ids)| (row.clone(), ids.clone()))
            .collect()
    }
}

impl CollectionInfo for Periodic {
    fn spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.name(),
            kind: CollectionKind::Periodic,
            column_names: self.column_names(),
            column_types: <(u64, TimePoint)>::sql_types(),
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
    fn ids_are_fresh_and_monotonic() {
        let p = Periodic::new("p", Duration::from_millis(100));
        assert_eq!(p.get_and_increment_id(), 0);
        assert_eq!(p.get_and_increment_id(), 1);
        assert_eq!(p.get_and_increment_id(), 2);
    }

    #[test]
    fn tick_clears_firings() {
        let p = Periodic::new("p", Duration::from_millis(100));
        let row = (p.get_and_increment_id(), TimePoint::epoch());
        p.merge(row, row.hashed(), 1);
        assert_eq!(p.rows(), vec![row]);
        p.tick();
        assert_eq!(p.rows(), vec![]);
    }
}
