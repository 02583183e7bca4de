//! ZeroMQ plumbing: the inbound socket and the outbound socket cache.
//!
//! Each node binds one PULL socket for inbound channel tuples. Outbound
//! sends go through a [`SocketCache`]: a map from address to connected PUSH
//! socket, populated the first time a tuple is sent to an address and never
//! evicted for the life of the node.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;

/// A lazily-populated map from ZeroMQ address to connected PUSH socket.
pub struct SocketCache {
    context: zmq::Context,
    sockets: HashMap<String, zmq::Socket>,
}

impl SocketCache {
    pub fn new(context: &zmq::Context) -> Self {
        SocketCache {
            context: context.clone(),
            sockets: HashMap::new(),
        }
    }

    /// Sends a multipart message to `address`, opening and caching the socket
    /// on first use.
    pub fn send(&mut self, address: &str, frames: Vec<Vec<u8>>) -> Result<()> {
        self.at(address)?.send_multipart(frames, 0)?;
        Ok(())
    }

    fn at(&mut self, address: &str) -> Result<&zmq::Socket> {
        if !self.sockets.contains_key(address) {
            let socket = self.context.socket(zmq::PUSH)?;
            socket.connect(address)?;
            tracing::info!(address, "opened outbound channel socket");
            self.sockets.insert(address.to_string(), socket);
        }
        Ok(&self.sockets[address])
    }
}

/// Everything networked a node owns: the context, the bound inbound socket,
/// and the outbound cache channels send through.
pub struct NetworkState {
    pub socket: zmq::Socket,
    pub cache: Rc<RefCell<SocketCache>>,
}

impl NetworkState {
    pub fn new(context: &zmq::Context, address: &str) -> Result<Self> {
        let socket = context.socket(zmq::PULL)?;
        socket.bind(address)?;
        tracing::info!(address, "fluent node listening");
        Ok(NetworkState {
            socket,
            cache: Rc::new(RefCell::new(SocketCache::new(context))),
        })
    }
}
