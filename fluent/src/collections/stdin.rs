//! Stdin as a single-column collection of lines.

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::collections::{
    merge_tuple, CollectionInfo, CollectionKind, CollectionTupleIds, Scannable,
};
use crate::error::Result;
use crate::lineage::{CollectionSpec, LineageSink};
use crate::row::Row;

/// Terminal input. The receive phase polls file descriptor 0 alongside the
/// inbound socket and inserts each line as a one-column tuple; like a
/// scratch, the collection is cleared at the end of the tick.
#[derive(Clone)]
pub struct Stdin {
    inner: Rc<RefCell<BTreeMap<(String,), CollectionTupleIds>>>,
}

impl Stdin {
    pub(crate) fn new() -> Self {
        Stdin {
            inner: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }

    /// The collection's name. There is one stdin per node.
    pub fn name(&self) -> String {
        "stdin".to_string()
    }

    /// The single column name.
    pub fn column_names(&self) -> Vec<String> {
        vec!["stdin".to_string()]
    }

    /// The lines received this tick.
    pub fn get(&self) -> Ref<'_, BTreeMap<(String,), CollectionTupleIds>> {
        self.inner.borrow()
    }

    /// The received lines, sorted.
    pub fn rows(&self) -> Vec<(String,)> {
        self.inner.borrow().keys().cloned().collect()
    }

    /// Reads one line from the terminal, without the trailing newline.
    pub fn read_line() -> std::io::Result<(String,)> {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok((line,))
    }

    /// Inserts a line. Called by the receive phase, never by rules.
    pub fn merge(&self, row: (String,), hash: u64, time: u64) {
        merge_tuple(&mut self.inner.borrow_mut(), row, hash, time);
    }

    /// Empties the collection, returning the lines it held.
    pub fn tick(&self) -> BTreeMap<(String,), CollectionTupleIds> {
        std::mem::take(&mut *self.inner.borrow_mut())
    }
}

impl Scannable for Stdin {
    type Row = (String,);
    fn scan_name(&self) -> String {
        self.name()
    }
    fn scan(&self) -> Vec<((String,), CollectionTupleIds)> {
        self.inner
            .borrow()
            .iter()
            .map(|(row, ids)| (row.clone(), ids.clone()))
            .collect()
    }
}

impl CollectionInfo for Stdin {
    fn spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.name(),
            kind: CollectionKind::Stdin,
            column_names: self.column_names(),
            column_types: <(String,)>::sql_types(),
        }
    }

    fn tick_collection(&self, sink: &mut dyn LineageSink, time: u64) -> Result<()> {
        let name = self.name();
        for (row, ids) in self.tick() {
            sink.delete_tuple(&name, ids.hash, time, &row.sql_values())?;
        }
        Ok(())
    }
}
