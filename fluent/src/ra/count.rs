//! Counts the stream.

use smallvec::SmallVec;

use crate::ra::{Lineaged, Pipeline, Provenance};

/// The `count` stage: yields the single tuple `(n,)` where `n` is the number
/// of input tuples. An empty stream counts to `(0,)`. The count's provenance
/// is the union of every counted tuple's.
#[derive(Clone)]
pub struct Count<P> {
    child: P,
}

impl<P> Count<P> {
    pub(crate) fn new(child: P) -> Self {
        Count { child }
    }
}

impl<P: Pipeline> Pipeline for Count<P> {
    type Item = (u64,);

    fn describe(&self) -> String {
        format!("Count({})", self.child.describe())
    }

    fn for_each<F: FnMut(Lineaged<(u64,)>)>(self, mut f: F) {
        let mut n = 0u64;
        let mut lineage: Provenance = SmallVec::new();
        self.child.for_each(|tuple| {
            n += 1;
            lineage.extend(tuple.lineage);
        });
        f(Lineaged { row: (n,), lineage });
    }
}
