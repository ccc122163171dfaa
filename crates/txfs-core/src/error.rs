//! Error types for txfs operations.

use std::path::PathBuf;

use thiserror::Error;

/// A specialized `Result` type for txfs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during txfs operations.
///
/// Variants group into the four failure classes of the engine: argument
/// errors, resource errors, state errors, and cleanup aggregation. All of
/// them fail locally and leave durable state unmodified.
#[derive(Debug, Error)]
pub enum Error {
    /// The store directory path was empty.
    #[error("store directory path is empty")]
    EmptyPath,

    /// The filename passed to open was empty.
    #[error("filename is empty")]
    EmptyFilename,

    /// The store path exists but is not a directory.
    #[error("{} exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The file path exists but is not a regular file.
    #[error("{} exists but is not a regular file", .0.display())]
    NotARegularFile(PathBuf),

    /// The declared length is smaller than the file's on-disk size.
    ///
    /// Opening a file may extend it, never shrink it.
    #[error("declared length {declared} is smaller than on-disk size {on_disk}")]
    LengthTooSmall {
        /// The length the caller declared at open time.
        declared: u64,
        /// The current size of the file on disk.
        on_disk: u64,
    },

    /// The file's advisory lock is held by another handle.
    #[error("{} is locked by another handle", .0.display())]
    Locked(PathBuf),

    /// The operation requires an open file handle.
    #[error("file {0} is not open")]
    NotOpen(String),

    /// The operation requires the file handle to be closed first.
    #[error("file {0} is still open")]
    StillOpen(String),

    /// No uncommitted transaction with this id exists in the manager.
    ///
    /// Returned for sync or abort of an id that was already committed,
    /// already aborted, or never created.
    #[error("no uncommitted transaction with id {0}")]
    UnknownTransaction(u32),

    /// A commit byte budget exceeded the transaction's staged write.
    #[error("commit budget {requested} exceeds staged write of {available} bytes")]
    BudgetExceeded {
        /// The number of bytes the caller asked to persist.
        requested: usize,
        /// The number of bytes the transaction actually staged.
        available: usize,
    },

    /// One or more per-log cleanups failed.
    ///
    /// Every log in the directory is still attempted; this aggregates the
    /// failures after the full pass.
    #[error("cleanup failed for {failed} log file(s)")]
    CleanupFailed {
        /// Number of log files whose cleanup did not complete.
        failed: usize,
    },

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error means the file's advisory lock was held.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }

    /// Returns true if this error means the file handle was not open.
    #[must_use]
    pub const fn is_not_open(&self) -> bool {
        matches!(self, Self::NotOpen(_))
    }
}
