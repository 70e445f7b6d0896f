//! Negotiated protocol state.
//!
//! A [`Session`] starts unnegotiated. The INIT handler establishes it once,
//! under the write lock; every other request only reads it.

use fusewire_abi::{InitFlags, NOTIFY_DELETE_MINOR_VERSION, notify_code};
use parking_lot::RwLock;

/// Protocol parameters agreed with the kernel during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSettings {
    /// Peer major version (always the one we speak).
    pub major: u32,
    /// Peer minor version, as offered.
    pub minor: u32,
    /// Readahead limit announced by the kernel.
    pub max_readahead: u32,
    /// Capabilities granted: the peer's offer masked by what we support.
    pub flags: InitFlags,
}

impl KernelSettings {
    /// Whether the peer understands the given notification code.
    pub fn supports_notify(&self, code: i32) -> bool {
        match code {
            notify_code::INVAL_INODE | notify_code::INVAL_ENTRY => true,
            notify_code::DELETE => self.minor >= NOTIFY_DELETE_MINOR_VERSION,
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    settings: Option<KernelSettings>,
    splice: bool,
}

/// Shared handshake state of one mount.
#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of a successful handshake.
    ///
    /// Returns `false`, leaving the state untouched, if the session was
    /// already established.
    pub fn establish(&self, settings: KernelSettings, splice: bool) -> bool {
        let mut state = self.state.write();
        if state.settings.is_some() {
            return false;
        }
        state.settings = Some(settings);
        state.splice = splice;
        true
    }

    /// Whether the handshake has completed.
    pub fn is_negotiated(&self) -> bool {
        self.state.read().settings.is_some()
    }

    /// Negotiated settings, or `None` before the handshake.
    pub fn settings(&self) -> Option<KernelSettings> {
        self.state.read().settings
    }

    /// Whether replies carrying a file descriptor may be spliced.
    pub fn splice_enabled(&self) -> bool {
        self.state.read().splice
    }
}
