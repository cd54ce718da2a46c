//! Error types for disk writer operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for disk writer operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while creating or driving a disk writer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backing file already exists.
    #[error("log file already exists: {}", path.display())]
    AlreadyExists {
        /// The path that was requested.
        path: PathBuf,
    },

    /// Another writer holds the advisory lock on the backing file.
    #[error("log file is locked by another writer: {}", path.display())]
    Locked {
        /// The locked path.
        path: PathBuf,
    },

    /// The writer has shut down and no longer accepts requests.
    #[error("disk writer is closed")]
    Closed,

    /// The writer refused the request.
    #[error("write rejected: {0}")]
    Rejected(String),
}
