//! Grouped and whole-stream aggregation.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::ra::aggregates::AggregateTuple;
use crate::ra::{Lineaged, Pipeline, Provenance};
use crate::row::{Concat, Row};

/// The `group_by` stage. Partitions the input by the key projection, folds
/// each partition through a fresh copy of the aggregate tuple, and on
/// exhaustion yields one tuple per key, in key order: the key columns
/// followed by each aggregate's final value. The emitted tuple's provenance
/// is the union of every contributor to its key.
pub struct GroupBy<P, Key, K, A> {
    child: P,
    key: Key,
    aggregates: A,
    key_type: PhantomData<K>,
}

impl<P, Key, K, A> GroupBy<P, Key, K, A> {
    pub(crate) fn new(child: P, key: Key, aggregates: A) -> Self {
        GroupBy {
            child,
            key,
            aggregates,
            key_type: PhantomData,
        }
    }
}

impl<P: Clone, Key: Clone, K, A: Clone> Clone for GroupBy<P, Key, K, A> {
    fn clone(&self) -> Self {
        GroupBy {
            child: self.child.clone(),
            key: self.key.clone(),
            aggregates: self.aggregates.clone(),
            key_type: PhantomData,
        }
    }
}

impl<P, Key, K, A> Pipeline for GroupBy<P, Key, K, A>
where
    P: Pipeline,
    K: Row + Concat<A::Output>,
    Key: Fn(&P::Item) -> K + Clone + 'static,
    A: AggregateTuple<P::Item>,
{
    type Item = <K as Concat<A::Output>>::Output;

    fn describe(&self) -> String {
        format!("GroupBy({})", self.child.describe())
    }

    fn for_each<F: FnMut(Lineaged<Self::Item>)>(self, mut f: F) {
        let key = self.key;
        let prototype = self.aggregates;
        let mut groups: BTreeMap<K, (A, Provenance)> = BTreeMap::new();

        self.child.for_each(|tuple| {
            let entry = groups
                .entry(key(&tuple.row))
                .or_insert_with(|| (prototype.clone(), SmallVec::new()));
            entry.0.observe(&tuple.row);
            entry.1.extend(tuple.lineage);
        });

        for (key, (aggregates, lineage)) in groups {
            f(Lineaged {
                row: key.concat(aggregates.finish()),
                lineage,
            });
        }
    }
}

/// The key-less counterpart of [`GroupBy`]: folds the entire stream through
/// the aggregate tuple and yields exactly one tuple, even when the stream is
/// empty.
#[derive(Clone)]
pub struct FullAggregate<P, A> {
    child: P,
    aggregates: A,
}

impl<P, A> FullAggregate<P, A> {
    pub(crate) fn new(child: P, aggregates: A) -> Self {
        FullAggregate { child, aggregates }
    }
}

impl<P, A> Pipeline for FullAggregate<P, A>
where
    P: Pipeline,
    A: AggregateTuple<P::Item>,
{
    type Item = A::Output;

    fn describe(&self) -> String {
        format!("Aggregate({})", self.child.describe())
    }

    fn for_each<F: FnMut(Lineaged<A::Output>)>(self, mut f: F) {
        let mut aggregates = self.aggregates;
        let mut lineage: Provenance = SmallVec::new();
        self.child.for_each(|tuple| {
            aggregates.observe(&tuple.row);
            lineage.extend(tuple.lineage);
        });
        f(Lineaged {
            row: aggregates.finish(),
            lineage,
        });
    }
}
