//! The relational-algebra pipeline: lazy, single-pass, provenance-carrying.
//!
//! A rule's right-hand side is a [`Pipeline`]: a composed stream of tuples
//! whose column list is carried in the associated `Item` type, so that every
//! stage is checked against its input schema at build time. Pipelines are
//! side-effect-free; evaluation happens when the rule engine drives
//! [`Pipeline::for_each`] over the stream, and all effects (writes, lineage
//! events) belong to the rule's write step.
//!
//! Every tuple flows wrapped in a [`Lineaged`]: the tuple plus the set of
//! [`LocalTupleId`]s it was derived from. Cursors over collections seed the
//! set with the source tuple's own occurrences; `map` and `project!` pass it
//! through, `filter` keeps or drops it whole, `cross` and hash joins union
//! the two sides, and grouped aggregation unions every contributor to the
//! emitted key.
//!
//! Pipelines are `Clone` because a rule fires once per tick for the life of
//! the node: the rule engine clones the pipeline and consumes the clone each
//! firing.

use smallvec::SmallVec;

use crate::collections::LocalTupleId;
use crate::row::{Concat, Row};

pub mod aggregates;
mod collection;
mod count;
mod cross;
mod filter;
mod group_by;
mod iterable;
mod join;
mod map;
mod project;

pub use collection::{collection, meta, Collection, Meta};
pub use count::Count;
pub use cross::Cross;
pub use filter::Filter;
pub use group_by::{FullAggregate, GroupBy};
pub use iterable::{iterable, Iterable};
pub use join::HashJoin;
pub use map::Map;

use self::aggregates::AggregateTuple;

/// The provenance set attached to a tuple in flight.
pub type Provenance = SmallVec<[LocalTupleId; 2]>;

/// A tuple plus the source occurrences it was derived from.
#[derive(Clone, Debug)]
pub struct Lineaged<R> {
    /// The tuple.
    pub row: R,
    /// Every source occurrence that contributed to it.
    pub lineage: Provenance,
}

impl<R> Lineaged<R> {
    /// A tuple with no provenance, as produced by external iterables.
    pub fn bare(row: R) -> Self {
        Lineaged {
            row,
            lineage: SmallVec::new(),
        }
    }
}

/// A lazily composed stream of tuples.
pub trait Pipeline: Clone + 'static {
    /// The output tuple type; its columns are the stage's schema.
    type Item: Row;

    /// A human-readable rendering, recorded with the rule in the lineage
    /// store.
    fn describe(&self) -> String;

    /// Drives the stream, calling `f` once per output tuple in stream order.
    fn for_each<F: FnMut(Lineaged<Self::Item>)>(self, f: F);

    /// Applies `f` to every tuple. Provenance passes through untouched.
    fn map<O, F>(self, f: F) -> Map<Self, F, O>
    where
        O: Row,
        F: Fn(Self::Item) -> O + Clone + 'static,
    {
        Map::new(self, f)
    }

    /// Retains the tuples `f` accepts.
    fn filter<F>(self, f: F) -> Filter<Self, F>
    where
        F: Fn(&Self::Item) -> bool + Clone + 'static,
    {
        Filter::new(self, f)
    }

    /// The Cartesian product. Output columns are `self`'s followed by
    /// `other`'s; the right side is materialized once and replayed per left
    /// tuple.
    fn cross<Q>(self, other: Q) -> Cross<Self, Q>
    where
        Q: Pipeline,
        Self::Item: Concat<Q::Item>,
    {
        Cross::new(self, other)
    }

    /// The equi-join of `self` and `other` on the given key projections.
    /// Builds a multi-map of the right side, streams the left, and emits
    /// `self`'s columns followed by `other`'s for each match.
    fn hash_join<Q, K, LeftKey, RightKey>(
        self,
        other: Q,
        left_key: LeftKey,
        right_key: RightKey,
    ) -> HashJoin<Self, Q, LeftKey, RightKey, K>
    where
        Q: Pipeline,
        Self::Item: Concat<Q::Item>,
        K: Eq + std::hash::Hash + Clone + 'static,
        LeftKey: Fn(&Self::Item) -> K + Clone + 'static,
        RightKey: Fn(&Q::Item) -> K + Clone + 'static,
    {
        HashJoin::new(self, other, left_key, right_key)
    }

    /// Partitions the stream by `key` and folds each partition through the
    /// aggregates. On exhaustion, yields one tuple per key: the key columns
    /// followed by each aggregate's final value.
    fn group_by<K, Key, A>(self, key: Key, aggregates: A) -> GroupBy<Self, Key, K, A>
    where
        K: Row + Concat<A::Output>,
        Key: Fn(&Self::Item) -> K + Clone + 'static,
        A: AggregateTuple<Self::Item>,
    {
        GroupBy::new(self, key, aggregates)
    }

    /// Folds the whole stream through the aggregates, yielding exactly one
    /// tuple even when the stream is empty.
    fn aggregate<A>(self, aggregates: A) -> FullAggregate<Self, A>
    where
        A: AggregateTuple<Self::Item>,
    {
        FullAggregate::new(self, aggregates)
    }

    /// Counts the stream, yielding the single tuple `(n,)`.
    fn count(self) -> Count<Self> {
        Count::new(self)
    }
}
