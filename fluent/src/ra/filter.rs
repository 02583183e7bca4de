//! Retains the tuples a predicate accepts.

use crate::ra::{Lineaged, Pipeline};

/// The `filter` stage. A tuple's provenance is kept or dropped with the
/// tuple; the predicate never splits it.
#[derive(Clone)]
pub struct Filter<P, F> {
    child: P,
    f: F,
}

impl<P, F> Filter<P, F> {
    pub(crate) fn new(child: P, f: F) -> Self {
        Filter { child, f }
    }
}

impl<P, F> Pipeline for Filter<P, F>
where
    P: Pipeline,
    F: Fn(&P::Item) -> bool + Clone + 'static,
{
    type Item = P::Item;

    fn describe(&self) -> String {
        format!("Filter({})", self.child.describe())
    }

    fn for_each<G: FnMut(Lineaged<P::Item>)>(self, mut f: G) {
        let keep = self.f;
        self.child.for_each(|input| {
            if keep(&input.row) {
                f(input);
            }
        });
    }
}
