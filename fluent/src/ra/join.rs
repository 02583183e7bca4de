//! Matches pairs of tuples based on a key.

use std::marker::PhantomData;

use fnv::FnvHashMap;

use crate::ra::{Lineaged, Pipeline};
use crate::row::Concat;

/// The `hash_join` stage: an equi-join on the two key projections.
///
/// The right side is drained into a multi-map keyed on its key projection;
/// the left side then streams, emitting the concatenation of the matching
/// pairs. Output order follows the left stream. Provenance is the union of
/// the two matched tuples'.
pub struct HashJoin<L, R, LeftKey, RightKey, K> {
    left: L,
    right: R,
    left_key: LeftKey,
    right_key: RightKey,
    key: PhantomData<K>,
}

impl<L, R, LeftKey, RightKey, K> HashJoin<L, R, LeftKey, RightKey, K> {
    pub(crate) fn new(left: L, right: R, left_key: LeftKey, right_key: RightKey) -> Self {
        HashJoin {
            left,
            right,
            left_key,
            right_key,
            key: PhantomData,
        }
    }
}

impl<L: Clone, R: Clone, LeftKey: Clone, RightKey: Clone, K> Clone
    for HashJoin<L, R, LeftKey, RightKey, K>
{
    fn clone(&self) -> Self {
        HashJoin {
            left: self.left.clone(),
            right: self.right.clone(),
            left_key: self.left_key.clone(),
            right_key: self.right_key.clone(),
            key: PhantomData,
        }
    }
}

impl<L, R, LeftKey, RightKey, K> Pipeline for HashJoin<L, R, LeftKey, RightKey, K>
where
    L: Pipeline,
    R: Pipeline,
    L::Item: Concat<R::Item>,
    K: Eq + std::hash::Hash + Clone + 'static,
    LeftKey: Fn(&L::Item) -> K + Clone + 'static,
    RightKey: Fn(&R::Item) -> K + Clone + 'static,
{
    type Item = <L::Item as Concat<R::Item>>::Output;

    fn describe(&self) -> String {
        format!(
            "HashJoin({}, {})",
            self.left.describe(),
            self.right.describe()
        )
    }

    fn for_each<F: FnMut(Lineaged<Self::Item>)>(self, mut f: F) {
        let right_key = self.right_key;
        let mut index: FnvHashMap<K, Vec<Lineaged<R::Item>>> = FnvHashMap::default();
        self.right.for_each(|tuple| {
            index.entry(right_key(&tuple.row)).or_default().push(tuple);
        });

        let left_key = self.left_key;
        self.left.for_each(|left| {
            if let Some(matches) = index.get(&left_key(&left.row)) {
                for matched in matches {
                    let mut lineage = left.lineage.clone();
                    lineage.extend(matched.lineage.iter().cloned());
                    f(Lineaged {
                        row: left.row.clone().concat(matched.row.clone()),
                        lineage,
                    });
                }
            }
        });
    }
}
