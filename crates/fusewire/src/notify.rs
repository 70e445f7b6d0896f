//! Unsolicited cache invalidation messages sent to the kernel.
//!
//! A notification is an ordinary reply header with `unique` 0 and the
//! positive notification code in the error field, followed by the record
//! and, for entry notifications, the NUL-terminated name.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use fusewire_abi::{
    NotifyInvalDeleteOut, NotifyInvalEntryOut, NotifyInvalInodeOut, OUT_HEADER_SIZE, Opcode,
    OutHeader, Status, notify_code,
};
use tracing::{debug, trace};
use zerocopy::{Immutable, IntoBytes};

use crate::registry;
use crate::server::{Channel, Server};

/// Encodes one notification message.
pub fn encode_notification<T: IntoBytes + Immutable>(
    code: i32,
    record: &T,
    name: Option<&[u8]>,
) -> Vec<u8> {
    let record = record.as_bytes();
    let name_len = name.map_or(0, |n| n.len() + 1);
    let len = OUT_HEADER_SIZE + record.len() + name_len;
    let header = OutHeader {
        len: len as u32,
        error: code,
        unique: 0,
    };
    let mut message = Vec::with_capacity(len);
    message.extend_from_slice(header.as_bytes());
    message.extend_from_slice(record);
    if let Some(name) = name {
        message.extend_from_slice(name);
        message.push(0);
    }
    message
}

impl<C: Channel> Server<C> {
    /// Invalidates cached data of `node` in the byte range `offset..offset + length`.
    ///
    /// A negative offset invalidates only attributes; a length of 0 means to
    /// the end of the file.
    pub fn notify_inval_inode(&self, node: u64, offset: i64, length: i64) -> Status {
        let record = NotifyInvalInodeOut {
            ino: node,
            off: offset,
            length,
        };
        self.send_notification(Opcode::NotifyInode, notify_code::INVAL_INODE, &record, None)
    }

    /// Invalidates the cached lookup of `name` in directory `parent`.
    pub fn notify_inval_entry(&self, parent: u64, name: &OsStr) -> Status {
        let name = name.as_bytes();
        let record = NotifyInvalEntryOut {
            parent,
            namelen: name.len() as u32,
            padding: 0,
        };
        self.send_notification(
            Opcode::NotifyEntry,
            notify_code::INVAL_ENTRY,
            &record,
            Some(name),
        )
    }

    /// Tells the kernel that `child`, reached as `name` in `parent`, was removed.
    ///
    /// Requires a peer speaking minor version 18 or later.
    pub fn notify_delete(&self, parent: u64, child: u64, name: &OsStr) -> Status {
        let name = name.as_bytes();
        let record = NotifyInvalDeleteOut {
            parent,
            child,
            namelen: name.len() as u32,
            padding: 0,
        };
        self.send_notification(Opcode::NotifyDelete, notify_code::DELETE, &record, Some(name))
    }

    fn send_notification<T: IntoBytes + Immutable>(
        &self,
        opcode: Opcode,
        code: i32,
        record: &T,
        name: Option<&[u8]>,
    ) -> Status {
        let Some(settings) = self.session().settings() else {
            debug!(op = %opcode, "notification before handshake");
            return Status::ENOSYS;
        };
        if !settings.supports_notify(code) {
            debug!(op = %opcode, minor = settings.minor, "peer does not support notification");
            return Status::ENOSYS;
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            let rendered = registry::describe(opcode.raw())
                .and_then(|d| d.render_output(record.as_bytes()))
                .unwrap_or_default();
            trace!(op = %opcode, record = %rendered, "notification");
        }

        let message = encode_notification(code, record, name);
        match self.channel().send(&message) {
            Ok(()) => {
                self.stats().record_notification();
                Status::OK
            }
            Err(e) => {
                debug!(op = %opcode, error = %e, "notification failed");
                Status::from(e)
            }
        }
    }
}
