//! Request dispatcher.
//!
//! Routes each decoded [`Request`] to its opcode's handler and records the
//! outcome. The dispatcher refuses, before any handler runs:
//!
//! - opcodes without a descriptor (`ENOSYS`)
//! - bodies shorter than the opcode's fixed layout (`EIO`)
//! - anything but INIT before the handshake (`EIO`)
//! - opcodes that have a descriptor but no handler (`ENOSYS`)

use std::sync::Arc;

use fusewire_abi::{Opcode, Status};
use tracing::{debug, trace};

use crate::config::ServerOptions;
use crate::filesystem::RawFileSystem;
use crate::request::Request;
use crate::session::Session;
use crate::stats::DispatchStats;

/// Serves one opcode: reads the request and fills in its status and reply.
pub(crate) type Handler = fn(&Dispatcher, &mut Request);

/// Routes requests to handlers backed by a [`RawFileSystem`].
pub struct Dispatcher {
    fs: Arc<dyn RawFileSystem>,
    session: Arc<Session>,
    options: ServerOptions,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    /// Creates a dispatcher. Options built as a struct literal are brought
    /// back into the ranges the builder enforces.
    pub fn new(fs: Arc<dyn RawFileSystem>, options: ServerOptions) -> Self {
        Self {
            fs,
            session: Arc::new(Session::new()),
            options: options.normalized(),
            stats: Arc::new(DispatchStats::new()),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }

    pub(crate) fn fs(&self) -> &dyn RawFileSystem {
        self.fs.as_ref()
    }

    /// Runs the handler for `req`, leaving the reply in the request.
    pub fn dispatch(&self, req: &mut Request) {
        let Some(descriptor) = req.descriptor() else {
            self.stats.record_unknown();
            debug!(
                unique = req.unique(),
                opcode = req.header().opcode,
                "unknown opcode"
            );
            self.fail(req, Status::ENOSYS);
            return;
        };
        self.stats.record_request(descriptor.opcode);
        trace!(request = %req, "dispatch");

        if req.is_truncated() {
            debug!(
                unique = req.unique(),
                op = descriptor.name,
                "request body shorter than its fixed layout"
            );
            self.fail(req, Status::EIO);
            return;
        }

        if descriptor.opcode != Opcode::Init && !self.session.is_negotiated() {
            debug!(
                unique = req.unique(),
                op = descriptor.name,
                "request before handshake"
            );
            self.stats.record_rejected_before_init();
            self.fail(req, Status::EIO);
            return;
        }

        match descriptor.handler {
            Some(handler) => handler(self, req),
            None => {
                debug!(unique = req.unique(), op = descriptor.name, "no handler");
                self.fail(req, Status::ENOSYS);
                return;
            }
        }

        if !req.status().is_ok() {
            self.stats.record_error();
        }
    }

    fn fail(&self, req: &mut Request, status: Status) {
        req.set_status(status);
        self.stats.record_error();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("session", &self.session)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
