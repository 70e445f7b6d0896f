//! FUSE kernel ABI for the fusewire dispatcher.
//!
//! Types and definitions used for communication between the kernel driver and
//! a user-space filesystem. The layouts match protocol major version
//! [`KERNEL_VERSION`] at minor [`OUR_MINOR_VERSION`]; peers older than
//! [`MINIMUM_MINOR_VERSION`] are refused during the handshake.
//!
//! # Components
//!
//! - [`Opcode`] - Closed set of operation codes, including the private NOTIFY_* range
//! - [`records`] - `#[repr(C)]` wire records with bounds-checked decode via `zerocopy`
//! - [`InitFlags`] / [`FattrFlags`] / [`FopenFlags`] - Capability and field bitsets
//! - [`Status`] - POSIX-style status carried in every reply header
//! - [`attr`] - Attribute codec: timestamps, mode classification, `stat` conversion

pub mod attr;
pub mod flags;
pub mod opcode;
pub mod records;
pub mod status;

pub use attr::{FileKind, FileMode, Timespec};
pub use flags::{FattrFlags, FopenFlags, InitFlags};
pub use opcode::{OPCODE_COUNT, Opcode};
pub use records::*;
pub use status::Status;

/// Protocol major version spoken by this implementation.
pub const KERNEL_VERSION: u32 = 7;

/// Highest protocol minor version whose record layouts this crate implements.
pub const OUR_MINOR_VERSION: u32 = 19;

/// Oldest protocol minor version accepted from the kernel.
pub const MINIMUM_MINOR_VERSION: u32 = 13;

/// Peer minor version from which splice transfers are enabled.
pub const SPLICE_MINOR_VERSION: u32 = 13;

/// Peer minor version from which NOTIFY_DELETE is understood.
pub const NOTIFY_DELETE_MINOR_VERSION: u32 = 18;

/// Largest write the kernel will ever send in a single request.
pub const MAX_KERNEL_WRITE: u32 = 128 * 1024;

/// Inode number reported for directory entries whose inode is unknown.
pub const UNKNOWN_INO: u64 = 0xffff_ffff;

/// Notification codes carried in the error field of unsolicited replies.
pub mod notify_code {
    pub const INVAL_INODE: i32 = 2;
    pub const INVAL_ENTRY: i32 = 3;
    pub const DELETE: i32 = 6;
}
