//! Channels: pseudo-collections whose merge is a network send.
//!
//! The first column of a channel is the address of the receiving node.
//! Merging the tuple `("tcp://10.0.0.2:8000", 1, 2)` does not store anything
//! locally: the columns are serialized and shipped to the socket for that
//! address, and the tuple materializes in the *receiver's* channel of the
//! same name at the receiver's next receive phase. Received tuples are
//! retained until the end of the tick that received them, never longer.

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::collections::{
    merge_tuple, CollectionInfo, CollectionKind, CollectionTupleIds, Scannable,
};
use crate::error::Result;
use crate::lineage::{CollectionSpec, LineageSink};
use crate::net::SocketCache;
use crate::row::AddressedRow;

/// A channel. `merge` sends; `receive` (called by the scheduler's receive
/// phase) retains until the next tick.
#[derive(Clone)]
pub struct Channel<R: AddressedRow> {
    inner: Rc<RefCell<ChannelInner<R>>>,
}

struct ChannelInner<R: AddressedRow> {
    node_id: u64,
    name: String,
    column_names: Vec<String>,
    rows: BTreeMap<R, CollectionTupleIds>,
    cache: Rc<RefCell<SocketCache>>,
}

impl<R: AddressedRow> Channel<R> {
    pub(crate) fn new(
        node_id: u64,
        name: &str,
        column_names: Vec<String>,
        cache: Rc<RefCell<SocketCache>>,
    ) -> Self {
        Channel {
            inner: Rc::new(RefCell::new(ChannelInner {
                node_id,
                name: name.to_string(),
                column_names,
                rows: BTreeMap::new(),
                cache,
            })),
        }
    }

    /// The channel's name.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// The declared column names.
    pub fn column_names(&self) -> Vec<String> {
        self.inner.borrow().column_names.clone()
    }

    /// The tuples received this tick.
    pub fn get(&self) -> Ref<'_, BTreeMap<R, CollectionTupleIds>> {
        Ref::map(self.inner.borrow(), |inner| &inner.rows)
    }

    /// The received tuples, sorted by value.
    pub fn rows(&self) -> Vec<R> {
        self.inner.borrow().rows.keys().cloned().collect()
    }

    /// Sends the tuple to the address in its first column. The tuple is not
    /// retained locally.
    pub fn merge(&self, row: R, _hash: u64, time: u64) -> Result<()> {
        let inner = self.inner.borrow();
        let mut frames = vec![
            inner.node_id.to_string().into_bytes(),
            inner.name.clone().into_bytes(),
            time.to_string().into_bytes(),
        ];
        for frame in row.encode_columns() {
            frames.push(frame.into_bytes());
        }
        let result = inner.cache.borrow_mut().send(row.address(), frames);
        result
    }

    /// Retains a tuple delivered by the receive phase until the next tick.
    pub fn receive(&self, row: R, hash: u64, time: u64) {
        merge_tuple(&mut self.inner.borrow_mut().rows, row, hash, time);
    }

    /// Empties the channel, returning the tuples received this tick.
    pub fn tick(&self) -> BTreeMap<R, CollectionTupleIds> {
        std::mem::take(&mut self.inner.borrow_mut().rows)
    }
}

impl<R: AddressedRow> Scannable for Channel<R> {
    type Row = R;
    fn scan_name(&self) -> String {
        self.name()
    }
    fn scan(&self) -> Vec<(R, CollectionTupleIds)> {
        self.inner
            .borrow()
            .rows
            .iter()
            .map(|(row, ids)| (row.clone(), ids.clone()))
            .collect()
    }
}

impl<R: AddressedRow> CollectionInfo for Channel<R> {
    fn spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.name(),
            kind: CollectionKind::Channel,
            column_names: self.column_names(),
            column_types: R::sql_types(),
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
