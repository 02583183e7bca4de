//! A cursor over an external tuple container.

use crate::ra::{Lineaged, Pipeline};
use crate::row::Row;

/// Builds a pipeline over tuples that live outside any collection, such as a
/// bootstrap seed. The tuples carry no provenance.
pub fn iterable<R, I>(name: &str, rows: I) -> Iterable<R>
where
    R: Row,
    I: IntoIterator<Item = R>,
{
    Iterable {
        name: name.to_string(),
        rows: rows.into_iter().collect(),
    }
}

/// See [`iterable`].
#[derive(Clone)]
pub struct Iterable<R: Row> {
    name: String,
    rows: Vec<R>,
}

impl<R: Row> Pipeline for Iterable<R> {
    type Item = R;

    fn describe(&self) -> String {
        self.name.clone()
    }

    fn for_each<F: FnMut(Lineaged<R>)>(self, mut f: F) {
        for row in self.rows {
            f(Lineaged::bare(row));
        }
    }
}
