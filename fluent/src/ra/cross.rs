//! The Cartesian product of two streams.

use crate::ra::{Lineaged, Pipeline};
use crate::row::Concat;

/// The `cross` stage. The right side is materialized once when evaluation
/// starts and replayed for every left tuple; output provenance is the union
/// of the two inputs'.
#[derive(Clone)]
pub struct Cross<L, R> {
    left: L,
    right: R,
}

impl<L, R> Cross<L, R> {
    pub(crate) fn new(left: L, right: R) -> Self {
        Cross { left, right }
    }
}

impl<L, R> Pipeline for Cross<L, R>
where
    L: Pipeline,
    R: Pipeline,
    L::Item: Concat<R::Item>,
{
    type Item = <L::Item as Concat<R::Item>>::Output;

    fn describe(&self) -> String {
        format!("Cross({}, {})", self.left.describe(), self.right.describe())
    }

    fn for_each<F: FnMut(Lineaged<Self::Item>)>(self, mut f: F) {
        let mut right = Vec::new();
        self.right.for_each(|tuple| right.push(tuple));

        self.left.for_each(|left| {
            for matched in right.iter() {
                let mut lineage = left.lineage.clone();
                lineage.extend(matched.lineage.iter().cloned());
                f(Lineaged {
                    row: left.row.clone().concat(matched.row.clone()),
                    lineage,
                });
            }
        });
    }
}
