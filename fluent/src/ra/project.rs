//! Selects and reorders columns by index.

/// Projects the pipeline onto the named column indices, in the order given.
///
/// ```
/// use fluent::project;
/// use fluent::ra::{iterable, Pipeline};
///
/// let swapped = project!(iterable("xs", vec![(1i64, "a".to_string())]), 1, 0);
/// let mut out = Vec::new();
/// swapped.for_each(|t| out.push(t.row));
/// assert_eq!(out, vec![("a".to_string(), 1i64)]);
/// ```
///
/// Indices are checked at compile time: projecting a column the input does
/// not have fails to build, exactly like naming a missing tuple field.
/// Duplicating an index is allowed.
#[macro_export]
macro_rules! project {
    ($pipeline:expr, $($index:tt),+ $(,)?) => {
        $crate::ra::Pipeline::map($pipeline, |t| ($(t.$index.clone(),)+))
    };
}
