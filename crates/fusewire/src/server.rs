//! Serve loop and worker pool.
//!
//! [`Server::serve`] reads kernel messages on the calling thread and hands
//! them to a fixed pool of workers over a bounded channel. Each worker owns
//! the request it is processing from parse to reply, and keeps one data
//! buffer that it reuses across READ and READDIR requests.
//!
//! # Components
//!
//! - [`Channel`] - Transport to the kernel: receive one message, send one reply
//! - [`FileChannel`] - `Channel` over an already-open device file
//! - [`Server`] - Dispatcher plus channel, running the worker pool

use std::fs::File;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;

use bytes::{Bytes, BytesMut};
use crossbeam_channel::{Receiver, Sender, bounded};
use fusewire_abi::Status;
use tracing::{debug, info, trace, warn};

use crate::config::ServerOptions;
use crate::dispatch::Dispatcher;
use crate::error::{ServerError, ServerResult};
use crate::filesystem::RawFileSystem;
use crate::read::FdSource;
use crate::registry::{self, REPLY_BUFFER_CAPACITY};
use crate::request::{Payload, Reply, Request};
use crate::session::Session;
use crate::stats::DispatchStats;

/// Message transport between the kernel and the server.
///
/// Every `send` must deliver one complete message; the kernel rejects
/// partial writes.
pub trait Channel: Send + Sync {
    /// Blocks for the next message. `Ok(None)` means the channel is closed.
    fn receive(&self) -> io::Result<Option<Bytes>>;

    fn send(&self, message: &[u8]) -> io::Result<()>;

    /// Sends a reply whose data comes from a file range.
    ///
    /// Transports able to move data between descriptors without copying
    /// override this; the default reads the range into memory.
    fn send_spliced(&self, reply: &Reply, source: &FdSource) -> io::Result<()> {
        let data = source.read_all()?;
        self.send(&reply.encode_with(&data))
    }
}

/// A [`Channel`] over an open FUSE device file.
#[derive(Debug)]
pub struct FileChannel {
    file: File,
    buffer_size: usize,
}

impl FileChannel {
    /// Wraps `file`, reading messages of at most `buffer_size` bytes.
    pub fn new(file: File, buffer_size: usize) -> Self {
        Self { file, buffer_size }
    }
}

impl Channel for FileChannel {
    fn receive(&self) -> io::Result<Option<Bytes>> {
        let mut buf = BytesMut::zeroed(self.buffer_size);
        loop {
            match (&self.file).read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Some(buf.freeze()));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                // The filesystem was unmounted.
                Err(e) if e.raw_os_error() == Some(libc::ENODEV) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }

    fn send(&self, message: &[u8]) -> io::Result<()> {
        let written = (&self.file).write(message)?;
        if written != message.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {written} of {} bytes", message.len()),
            ));
        }
        Ok(())
    }
}

/// Read errors after which the serve loop simply reads again.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        // ENOENT: the request was interrupted before we read it.
        Some(libc::ENOENT | libc::EINTR | libc::EAGAIN)
    ) || e.kind() == io::ErrorKind::Interrupted
}

/// A dispatcher bound to a channel.
pub struct Server<C> {
    dispatcher: Dispatcher,
    channel: C,
}

impl<C: Channel> Server<C> {
    /// Creates a server.
    ///
    /// Fails if any operation's reply record does not fit the reply buffer.
    pub fn new(fs: Arc<dyn RawFileSystem>, channel: C, options: ServerOptions) -> ServerResult<Self> {
        registry::check_reply_capacity(REPLY_BUFFER_CAPACITY)?;
        Ok(Self {
            dispatcher: Dispatcher::new(fs, options),
            channel,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn session(&self) -> &Arc<Session> {
        self.dispatcher.session()
    }

    pub fn stats(&self) -> &Arc<DispatchStats> {
        self.dispatcher.stats()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Serves requests until the channel closes.
    pub fn serve(&self) -> ServerResult<()> {
        let options = self.dispatcher.options();
        info!(
            workers = options.worker_count,
            max_write = options.max_write,
            "serve loop started"
        );

        let (tx, rx) = bounded::<Bytes>(options.queue_capacity());
        let result = thread::scope(|scope| {
            // Owned here so an early return closes the queue before the join.
            let tx = tx;
            for worker_id in 0..options.worker_count {
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("fusewire-worker-{worker_id}"))
                    .spawn_scoped(scope, move || self.worker_loop(worker_id, &rx))?;
            }
            drop(rx);
            self.read_loop(&tx)
        });

        info!(stats = %self.stats().snapshot(), "serve loop finished");
        result
    }

    /// Handles one message synchronously, writing its reply if it has one.
    pub fn handle_message(&self, message: Bytes) -> ServerResult<()> {
        self.process(message, Vec::new()).map(|_| ())
    }

    fn read_loop(&self, tx: &Sender<Bytes>) -> ServerResult<()> {
        loop {
            match self.channel.receive() {
                Ok(Some(message)) => {
                    if tx.send(message).is_err() {
                        return Err(ServerError::WorkerPool);
                    }
                }
                Ok(None) => {
                    debug!("channel closed");
                    return Ok(());
                }
                Err(e) if is_transient(&e) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn worker_loop(&self, worker_id: usize, rx: &Receiver<Bytes>) {
        debug!(worker_id, "worker started");
        let keep_limit = self.dispatcher.options().receive_buffer_size();
        let mut buffer = Vec::new();
        while let Ok(message) = rx.recv() {
            match self.process(message, std::mem::take(&mut buffer)) {
                Ok(Some(recycled)) if recycled.capacity() <= keep_limit => buffer = recycled,
                Ok(_) => {}
                Err(e) => warn!(worker_id, error = %e, "failed to handle request"),
            }
        }
        debug!(worker_id, "worker exiting");
    }

    /// Dispatches one message and writes the reply, returning the data
    /// buffer for reuse.
    fn process(&self, message: Bytes, buffer: Vec<u8>) -> ServerResult<Option<Vec<u8>>> {
        let mut req = Request::parse(message)?.with_buffer(buffer);
        self.dispatcher.dispatch(&mut req);
        let Some(reply) = req.into_reply() else {
            return Ok(None);
        };
        trace!(reply = %reply, "reply");
        self.write_reply(&reply)?;
        Ok(reply.into_buffer())
    }

    fn write_reply(&self, reply: &Reply) -> ServerResult<()> {
        let result = match reply.payload() {
            Payload::Fd(source) if self.session().splice_enabled() => {
                self.channel.send_spliced(reply, source)
            }
            Payload::Fd(source) => match source.read_all() {
                Ok(data) => self.channel.send(&reply.encode_with(&data)),
                Err(e) => {
                    warn!(unique = reply.unique(), error = %e, "reading reply data failed");
                    self.channel.send(&reply.encode_error(Status::from(&e)))
                }
            },
            Payload::None => self.channel.send(&reply.encode_with(&[])),
            Payload::Data(data) => self.channel.send(&reply.encode_with(data)),
        };

        match result {
            Ok(()) => {
                self.stats().record_reply();
                Ok(())
            }
            Err(e) if e.raw_os_error() == Some(libc::ENOENT) => {
                debug!(unique = reply.unique(), "request interrupted before reply");
                Ok(())
            }
            Err(e) => {
                self.stats().record_reply_failure();
                warn!(unique = reply.unique(), error = %e, "writing reply failed");
                Err(e.into())
            }
        }
    }
}

impl<C> std::fmt::Debug for Server<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
