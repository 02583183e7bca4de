//! The six collection kinds and their per-tick bookkeeping.
//!
//! A collection is a typed store of tuples inside a node. Tables persist for
//! the node's lifetime and support deferred writes; scratches, channels,
//! stdin, stdout, and periodics live for a single tick. Every tuple currently
//! residing in a collection carries a [`CollectionTupleIds`]: its stable
//! content hash plus the set of logical times at which that same tuple was
//! inserted. Write primitives take the hash from the caller so the rule
//! engine can reuse it as the lineage key.
//!
//! Collection handles are cheap clones over shared state. Rules capture
//! handles; the scheduler holds one erased handle per collection for the
//! end-of-tick sweep.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::lineage::{CollectionSpec, LineageSink};
use crate::row::Row;

mod channel;
mod periodic;
mod scratch;
mod stdin;
mod stdout;
mod table;

pub use channel::Channel;
pub use periodic::Periodic;
pub use scratch::Scratch;
pub use stdin::Stdin;
pub use stdout::Stdout;
pub use table::Table;

/// Which of the six kinds a collection is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionKind {
    /// Persists across ticks; accepts merge, deferred merge, deferred delete.
    Table,
    /// Cleared every tick; accepts merge.
    Scratch,
    /// Sends on merge; cleared every tick.
    Channel,
    /// Terminal input; written by the receive phase.
    Stdin,
    /// Terminal output; printed on merge or at tick.
    Stdout,
    /// Written by the scheduler on a timer; cleared every tick.
    Periodic,
}

impl CollectionKind {
    /// The kind's name as recorded in the lineage store.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Table => "Table",
            CollectionKind::Scratch => "Scratch",
            CollectionKind::Channel => "Channel",
            CollectionKind::Stdin => "Stdin",
            CollectionKind::Stdout => "Stdout",
            CollectionKind::Periodic => "Periodic",
        }
    }
}

/// The identity of one tuple occurrence: which collection it sits in, its
/// content hash, and the logical time it was inserted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LocalTupleId {
    /// The collection holding the tuple.
    pub collection: String,
    /// The tuple's stable content hash.
    pub hash: u64,
    /// The logical time of the insertion.
    pub time: u64,
}

/// Per-tuple bookkeeping: the content hash plus every logical time at which
/// this same tuple was inserted. All times share the recorded hash.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollectionTupleIds {
    /// The tuple's stable content hash.
    pub hash: u64,
    /// Every logical time at which the tuple was inserted.
    pub times: BTreeSet<u64>,
}

/// Inserts `(row, hash, time)` into a collection map, folding the time into
/// the existing entry when the tuple is already present.
///
/// Panics when the supplied hash disagrees with the recorded one; two hashes
/// for one tuple value is a programming bug, not a recoverable error.
pub(crate) fn merge_tuple<R: Ord + std::fmt::Debug>(
    map: &mut BTreeMap<R, CollectionTupleIds>,
    row: R,
    hash: u64,
    time: u64,
) {
    match map.entry(row) {
        std::collections::btree_map::Entry::Vacant(entry) => {
            entry.insert(CollectionTupleIds {
                hash,
                times: BTreeSet::from([time]),
            });
        }
        std::collections::btree_map::Entry::Occupied(mut entry) => {
            assert_eq!(
                entry.get().hash,
                hash,
                "tuple {:?} recorded with two distinct hashes",
                entry.key()
            );
            entry.get_mut().times.insert(time);
        }
    }
}

/// Collections a pipeline can read: everything except stdout.
///
/// `scan` snapshots the live contents, so a rule that writes into the
/// collection it reads sees the state from the start of its own firing.
pub trait Scannable: Clone {
    /// The collection's row type.
    type Row: Row;
    /// The collection's name.
    fn scan_name(&self) -> String;
    /// A snapshot of the live contents, sorted by tuple value.
    fn scan(&self) -> Vec<(Self::Row, CollectionTupleIds)>;
}

/// The erased per-collection surface the scheduler needs: the declaration
/// shipped to the lineage sink at startup, and the end-of-tick sweep that
/// routes removed tuples to the sink as deletions.
pub(crate) trait CollectionInfo {
    fn spec(&self) -> CollectionSpec;
    fn tick_collection(&self, sink: &mut dyn LineageSink, time: u64) -> Result<()>;
}
