//! Error types for SwapLog channels.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use swaplog_storage::StorageError;
use thiserror::Error;

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur in log channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The log file already exists.
    #[error("log file already exists: {}", path.display())]
    AlreadyExists {
        /// The path that was requested.
        path: PathBuf,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Disk writer error.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// A buffer could not be allocated.
    #[error("out of memory allocating a {capacity}-byte buffer")]
    OutOfMemory {
        /// Requested buffer capacity.
        capacity: usize,
    },

    /// A record plus its newline exceeds the buffer capacity.
    #[error("record of {len} bytes does not fit a {capacity}-byte buffer")]
    RecordTooLarge {
        /// Record length without the newline.
        len: usize,
        /// Buffer capacity.
        capacity: usize,
    },

    /// The full buffer could not be handed to the disk writer.
    ///
    /// The record was not appended; previously buffered data is intact.
    #[error("failed to submit buffer write: {0}")]
    WriteSubmission(#[source] StorageError),

    /// A previously submitted write reported failure.
    #[error("write at offset {offset} failed: {source}")]
    WriteFailed {
        /// File offset of the failed write.
        offset: u64,
        /// The failure reported by the writer.
        #[source]
        source: StorageError,
    },

    /// The in-flight write did not complete within the configured timeout.
    #[error("in-flight write did not complete within {waited:?}")]
    WriteTimeout {
        /// How long the caller waited.
        waited: Duration,
    },

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The channel was used after `close`.
    #[error("log channel used after close")]
    UseAfterClose,
}

impl ChannelError {
    /// Returns true if the same call may succeed when retried.
    ///
    /// Too-large records may succeed when shortened; submission failures
    /// and timeouts leave the channel consistent and may clear up.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RecordTooLarge { .. } | Self::WriteSubmission(_) | Self::WriteTimeout { .. }
        )
    }
}

impl From<StorageError> for ChannelError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists { path } => Self::AlreadyExists { path },
            StorageError::Io(e) => Self::Io(e),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_already_exists_maps_to_channel_variant() {
        let err: ChannelError = StorageError::AlreadyExists {
            path: PathBuf::from("run.log"),
        }
        .into();
        assert!(matches!(err, ChannelError::AlreadyExists { .. }));
        assert!(err.to_string().contains("run.log"));
    }

    #[test]
    fn storage_io_maps_to_io() {
        let err: ChannelError =
            StorageError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")).into();
        assert!(matches!(err, ChannelError::Io(_)));
    }

    #[test]
    fn retryable_kinds() {
        assert!(ChannelError::RecordTooLarge { len: 10, capacity: 4 }.is_retryable());
        assert!(ChannelError::WriteSubmission(StorageError::Closed).is_retryable());
        assert!(!ChannelError::UseAfterClose.is_retryable());
        assert!(!ChannelError::OutOfMemory { capacity: 1 }.is_retryable());
    }
}
