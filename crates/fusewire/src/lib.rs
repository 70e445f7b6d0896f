//! Request dispatcher for the FUSE kernel protocol.
//!
//! This crate sits between the kernel's FUSE device and a filesystem
//! implementation. It decodes each kernel message, checks it against a
//! per-opcode descriptor table, routes it to a [`RawFileSystem`] method and
//! encodes the reply, including the protocol handshake, extended-attribute
//! size negotiation and cache invalidation notifications.
//!
//! # Components
//!
//! - [`registry`] - Per-opcode descriptors: record sizes, filename arity, handlers
//! - [`Request`] / [`Reply`] - Message split and reply encoding
//! - [`Dispatcher`] - Validation and routing of one request
//! - [`Server`] - Worker pool reading from a [`Channel`]
//! - [`Session`] - Negotiated protocol version and capabilities
//! - [`DispatchStats`] - Lock-free per-opcode counters
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use fusewire::{FileChannel, Server, ServerOptions};
//!
//! let options = ServerOptions::default().max_write(128 * 1024);
//! let channel = FileChannel::new(device, options.receive_buffer_size());
//! let server = Server::new(Arc::new(my_fs), channel, options)?;
//! server.serve()?;
//! ```

pub use fusewire_abi as abi;

pub mod config;
pub mod dirent;
pub mod dispatch;
pub mod error;
pub mod filesystem;
mod handlers;
pub mod notify;
pub mod read;
pub mod registry;
pub mod request;
pub mod server;
pub mod session;
pub mod stats;

pub use config::ServerOptions;
pub use dirent::{DirEntry, DirEntryList};
pub use dispatch::Dispatcher;
pub use error::{ParseError, ServerError, ServerResult};
pub use filesystem::RawFileSystem;
pub use notify::encode_notification;
pub use read::{FdSource, ReadResult};
pub use request::{Context, Payload, Reply, Request};
pub use server::{Channel, FileChannel, Server};
pub use session::{KernelSettings, Session};
pub use stats::{DispatchStats, DispatchStatsSnapshot};
