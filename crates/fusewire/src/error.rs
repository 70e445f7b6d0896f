//! Error types for the server and message parsing.
//!
//! Per-request failures never surface here: they travel back to the kernel
//! as a [`Status`](fusewire_abi::Status) in the reply header. The types in
//! this module cover infrastructure failures, such as a registry that does
//! not fit the reply buffer or a channel that stopped working.

use std::io;
use thiserror::Error;

/// A kernel message that cannot be turned into a request.
///
/// Without a decoded header there is no unique id to answer, so these
/// messages are logged and dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Message shorter than the request header.
    #[error("message too short for request header: {len} bytes")]
    ShortHeader { len: usize },

    /// Header length field disagrees with the number of bytes received.
    #[error("header declares {declared} bytes but message holds {actual}")]
    LengthMismatch { declared: u32, actual: usize },
}

/// Errors raised while constructing or running a server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// An operation's reply record does not fit the reply buffer.
    #[error(
        "reply buffer too small for {operation}: needs {needed} bytes, capacity is {capacity}"
    )]
    ReplyCapacity {
        operation: &'static str,
        needed: usize,
        capacity: usize,
    },

    /// Malformed kernel message.
    #[error("malformed request: {0}")]
    Parse(#[from] ParseError),

    /// Channel I/O error.
    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),

    /// A worker thread panicked or the worker queue closed early.
    #[error("worker pool stopped unexpectedly")]
    WorkerPool,
}

impl ServerError {
    /// Converts this error to a libc error code.
    pub fn to_errno(&self) -> i32 {
        match self {
            ServerError::ReplyCapacity { .. } => libc::ENOMEM,
            ServerError::Parse(_) => libc::EINVAL,
            ServerError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            ServerError::WorkerPool => libc::EIO,
        }
    }
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
