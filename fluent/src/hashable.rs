//! Stable content hashes for tuples.
//!
//! Every tuple that enters a collection is identified by a 64-bit hash of its
//! column values. The hash doubles as the tuple's key in the lineage store, so
//! it must be stable: equal tuples hash equally, within a process and across
//! processes. A channel tuple received from a remote node re-hashes to exactly
//! the value the sender recorded, which is what lets networked lineage edges
//! join against the sender's history.
//!
//! The implementation hashes with Fnv, which is deterministic (no per-process
//! seed, unlike `std::collections::HashMap`'s default hasher) and cheap for
//! the short keys tuples produce.

use std::hash::{Hash, Hasher};

/// Types with a stable `hashed` method.
///
/// The blanket implementation covers every `Hash` type, which includes all
/// tuples of columns. Do not override it for types that flow through
/// channels; both ends of a channel must agree on the hash.
pub trait Hashable {
    /// A well-distributed, deterministic integer derived from the data.
    fn hashed(&self) -> u64;
}

impl<T: Hash> Hashable for T {
    fn hashed(&self) -> u64 {
        let mut hasher: fnv::FnvHasher = Default::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
