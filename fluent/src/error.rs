//! The error type threaded through `tick`, `receive`, and `run`.
//!
//! Errors are grouped by the part of the runtime that produced them rather
//! than by type name, mirroring how callers react to them: configuration and
//! user errors are fatal before the main loop starts, codec errors cost one
//! message, transport and sink errors surface from the scheduler entry points
//! and the caller decides whether to abort. Invariant breaks inside
//! collections are programming bugs and panic instead.

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Anything that can go wrong while building or running a Fluent node.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A malformed program: duplicate collection names, arity mismatches,
    /// or a black-box registration that violates the channel contracts.
    #[error("configuration error: {0}")]
    Config(String),

    /// An inbound column failed to parse. The message is dropped; the node
    /// keeps running.
    #[error("codec error: {0}")]
    Codec(String),

    /// A socket operation failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A tuple or time stamp inside a collection contradicts its bookkeeping.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// The lineage store rejected a call.
    #[error("lineage sink error: {0}")]
    Sink(String),

    /// A user-supplied black-box lineage fragment was rejected.
    #[error("black-box lineage error: {0}")]
    User(String),
}

impl From<zmq::Error> for Error {
    fn from(error: zmq::Error) -> Self {
        Error::Transport(error.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Transport(error.to_string())
    }
}

impl From<postgres::Error> for Error {
    fn from(error: postgres::Error) -> Self {
        Error::Sink(error.to_string())
    }
}
