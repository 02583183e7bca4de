//! Cursors over a collection's current tuples.

use smallvec::smallvec;

use crate::collections::{LocalTupleId, Scannable};
use crate::ra::{Lineaged, Pipeline};
use crate::row::Concat;

/// Builds a pipeline over a collection's live contents.
///
/// The contents are snapshotted when evaluation starts, so a rule that reads
/// the collection it writes sees the state from the start of its own firing.
/// Each tuple's provenance is seeded with a single [`LocalTupleId`] naming
/// its earliest insertion; a tuple contributes one derived-lineage edge per
/// rule firing no matter how many times it was re-inserted. Rules that need
/// one edge per occurrence read through [`meta`] instead.
pub fn collection<C: Scannable + 'static>(source: &C) -> Collection<C> {
    Collection {
        source: source.clone(),
    }
}

/// See [`collection`].
#[derive(Clone)]
pub struct Collection<C: Scannable> {
    source: C,
}

impl<C: Scannable + 'static> Pipeline for Collection<C> {
    type Item = C::Row;

    fn describe(&self) -> String {
        self.source.scan_name()
    }

    fn for_each<F: FnMut(Lineaged<C::Row>)>(self, mut f: F) {
        let name = self.source.scan_name();
        for (row, ids) in self.source.scan() {
            let inserted = ids.times.iter().next().copied().unwrap_or(0);
            f(Lineaged {
                row,
                lineage: smallvec![LocalTupleId {
                    collection: name.clone(),
                    hash: ids.hash,
                    time: inserted,
                }],
            });
        }
    }
}

/// Builds a pipeline over `(tuple, occurrence)` pairs: the collection's
/// columns extended with a trailing [`LocalTupleId`] column, one output tuple
/// per recorded insertion time. For rules whose logic depends on lineage.
pub fn meta<C>(source: &C) -> Meta<C>
where
    C: Scannable + 'static,
    C::Row: Concat<(LocalTupleId,)>,
{
    Meta {
        source: source.clone(),
    }
}

/// See [`meta`].
#[derive(Clone)]
pub struct Meta<C: Scannable> {
    source: C,
}

impl<C> Pipeline for Meta<C>
where
    C: Scannable + 'static,
    C::Row: Concat<(LocalTupleId,)>,
{
    type Item = <C::Row as Concat<(LocalTupleId,)>>::Output;

    fn describe(&self) -> String {
        format!("Meta({})", self.source.scan_name())
    }

    fn for_each<F: FnMut(Lineaged<Self::Item>)>(self, mut f: F) {
        let name = self.source.scan_name();
        for (row, ids) in self.source.scan() {
            for &time in ids.times.iter() {
                let id = LocalTupleId {
                    collection: name.clone(),
                    hash: ids.hash,
                    time,
                };
                f(Lineaged {
                    row: row.clone().concat((id.clone(),)),
                    lineage: smallvec![id],
                });
            }
        }
    }
}
