//! Server configuration.
//!
//! The embedding process builds a [`ServerOptions`] and hands it to
//! [`Server::new`](crate::Server::new); nothing is read from the
//! environment or the command line here.

use fusewire_abi::MAX_KERNEL_WRITE;

/// Default maximum write size (64 KiB).
pub const DEFAULT_MAX_WRITE: u32 = 64 * 1024;

/// Smallest maximum write size accepted (one page).
pub const MIN_MAX_WRITE: u32 = 4 * 1024;

/// Default number of outstanding background requests the kernel may queue.
pub const DEFAULT_MAX_BACKGROUND: u16 = 12;

/// Extra space in each receive buffer for the request header and
/// fixed-size input record that precede WRITE data.
pub const RECEIVE_HEADROOM: usize = 4 * 1024;

/// Configuration options for the dispatcher and its worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Largest WRITE payload advertised to the kernel.
    ///
    /// Clamped to [`MIN_MAX_WRITE`]..=[`MAX_KERNEL_WRITE`]. Default: 64 KiB.
    pub max_write: u32,

    /// Background queue limit advertised to the kernel. Default: 12.
    ///
    /// The congestion threshold is derived as three quarters of this value.
    pub max_background: u16,

    /// Never forward FORGET or BATCH_FORGET to the filesystem.
    ///
    /// Useful for filesystems that hand out stable node ids and keep
    /// every inode alive for the lifetime of the mount.
    pub remember_inodes: bool,

    /// Answer GETXATTR for security labels and POSIX ACLs with ENODATA
    /// without consulting the filesystem.
    pub ignore_security_labels: bool,

    /// Number of worker threads handling requests. Default: CPU count.
    pub worker_count: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_write: DEFAULT_MAX_WRITE,
            max_background: DEFAULT_MAX_BACKGROUND,
            remember_inodes: false,
            ignore_security_labels: false,
            worker_count: num_cpus::get().max(1),
        }
    }
}

impl ServerOptions {
    /// Configuration that handles every request on a single worker.
    pub fn single_threaded() -> Self {
        Self {
            worker_count: 1,
            ..Default::default()
        }
    }

    /// Sets the maximum write size, clamped to the range the kernel accepts.
    #[must_use]
    pub fn max_write(mut self, bytes: u32) -> Self {
        self.max_write = bytes.clamp(MIN_MAX_WRITE, MAX_KERNEL_WRITE);
        self
    }

    /// Sets the background queue limit.
    #[must_use]
    pub fn max_background(mut self, limit: u16) -> Self {
        self.max_background = limit;
        self
    }

    /// Stops forwarding forget notifications to the filesystem.
    #[must_use]
    pub fn remember_inodes(mut self, remember: bool) -> Self {
        self.remember_inodes = remember;
        self
    }

    /// Suppresses security-label and ACL attribute queries.
    #[must_use]
    pub fn ignore_security_labels(mut self, ignore: bool) -> Self {
        self.ignore_security_labels = ignore;
        self
    }

    /// Sets the number of worker threads (at least one).
    #[must_use]
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }

    /// Reapplies the builder's limits to fields set directly.
    pub(crate) fn normalized(self) -> Self {
        let max_write = self.max_write;
        let worker_count = self.worker_count;
        self.max_write(max_write).worker_count(worker_count)
    }

    /// Congestion threshold advertised in the INIT reply.
    pub fn congestion_threshold(&self) -> u16 {
        (u32::from(self.max_background) * 3 / 4) as u16
    }

    /// Size of a buffer able to hold any request the kernel may send.
    pub fn receive_buffer_size(&self) -> usize {
        self.max_write as usize + RECEIVE_HEADROOM
    }

    /// Capacity of the queue between the reader and the workers.
    pub(crate) fn queue_capacity(&self) -> usize {
        self.worker_count * 4
    }
}
