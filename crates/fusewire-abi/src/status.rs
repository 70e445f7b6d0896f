//! Status codes carried in reply headers.
//!
//! A [`Status`] is a positive POSIX error number, or zero for success. It is
//! negated when written into [`OutHeader::error`](crate::OutHeader).

use std::fmt;
use std::io;

/// POSIX-style result of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(pub i32);

impl Status {
    pub const OK: Status = Status(0);
    pub const EPERM: Status = Status(libc::EPERM);
    pub const ENOENT: Status = Status(libc::ENOENT);
    pub const EIO: Status = Status(libc::EIO);
    pub const EBADF: Status = Status(libc::EBADF);
    pub const EACCES: Status = Status(libc::EACCES);
    pub const EEXIST: Status = Status(libc::EEXIST);
    pub const ENOTDIR: Status = Status(libc::ENOTDIR);
    pub const EISDIR: Status = Status(libc::EISDIR);
    pub const EINVAL: Status = Status(libc::EINVAL);
    pub const ENOSPC: Status = Status(libc::ENOSPC);
    pub const ERANGE: Status = Status(libc::ERANGE);
    pub const ENOSYS: Status = Status(libc::ENOSYS);
    pub const ENOTEMPTY: Status = Status(libc::ENOTEMPTY);
    pub const ENODATA: Status = Status(libc::ENODATA);
    pub const ENOTSUP: Status = Status(libc::ENOTSUP);

    /// Returns `true` for the success status.
    #[inline]
    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Raw error number.
    #[inline]
    pub fn errno(self) -> i32 {
        self.0
    }

    /// Value written into the reply header's error field.
    #[inline]
    pub fn wire_error(self) -> i32 {
        -self.0
    }

    /// Converts to a `Result`, mapping success to `Ok(())`.
    pub fn into_result(self) -> Result<(), Status> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("OK");
        }
        write!(f, "{} ({})", self.0, io::Error::from_raw_os_error(self.0))
    }
}

/// Maps an I/O error to its errno, falling back to EIO when it carries none.
impl From<io::Error> for Status {
    fn from(e: io::Error) -> Self {
        Status(e.raw_os_error().unwrap_or(libc::EIO))
    }
}

impl From<&io::Error> for Status {
    fn from(e: &io::Error) -> Self {
        Status(e.raw_os_error().unwrap_or(libc::EIO))
    }
}

impl From<Status> for io::Error {
    fn from(status: Status) -> Self {
        io::Error::from_raw_os_error(status.0)
    }
}
