//! Asynchronous disk writer trait and request types.

use crate::error::{StorageError, StorageResult};
use std::fmt;
use thiserror::Error;

/// Callback invoked exactly once when a submitted write finishes.
pub type CompletionFn = Box<dyn FnOnce(WriteOutcome) + Send + 'static>;

/// A positioned write handed to an [`AsyncDiskWriter`].
///
/// The request owns the buffer for as long as the write is in flight. The
/// buffer comes back to the submitter inside the [`WriteOutcome`] (or inside
/// a [`SubmitError`] if the writer refuses the request), so the submitter
/// cannot reuse it while the disk still needs it.
pub struct WriteRequest {
    buffer: Vec<u8>,
    offset: u64,
    on_complete: CompletionFn,
}

impl WriteRequest {
    /// Creates a request to write all of `buffer` at `offset`.
    pub fn new<F>(buffer: Vec<u8>, offset: u64, on_complete: F) -> Self
    where
        F: FnOnce(WriteOutcome) + Send + 'static,
    {
        Self {
            buffer,
            offset,
            on_complete: Box::new(on_complete),
        }
    }

    /// File offset the data is written at.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes to write.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes to write.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the request carries no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Finishes the request, handing the buffer and `result` to the callback.
    pub fn complete(self, result: StorageResult<usize>) {
        let Self {
            buffer,
            offset,
            on_complete,
        } = self;
        on_complete(WriteOutcome {
            buffer,
            offset,
            result,
        });
    }

    /// Drops the callback without invoking it and returns the buffer.
    #[must_use]
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

impl fmt::Debug for WriteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteRequest")
            .field("offset", &self.offset)
            .field("len", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

/// Result of a finished write, delivered to the request's callback.
#[derive(Debug)]
pub struct WriteOutcome {
    /// The buffer that was written, returned to its owner.
    pub buffer: Vec<u8>,
    /// Offset the write targeted.
    pub offset: u64,
    /// Bytes written, or the failure.
    pub result: StorageResult<usize>,
}

/// A submission the writer refused. The request is handed back untouched.
#[derive(Debug, Error)]
#[error("write submission failed: {error}")]
pub struct SubmitError {
    /// Why the submission was refused.
    #[source]
    pub error: StorageError,
    /// The refused request; its callback has not run.
    pub request: WriteRequest,
}

impl SubmitError {
    /// Creates a submission error returning `request` to the caller.
    #[must_use]
    pub fn new(error: StorageError, request: WriteRequest) -> Self {
        Self { error, request }
    }
}

/// An asynchronous positioned writer for a single backing file.
///
/// Writers accept a buffer plus a file offset and report completion later,
/// from their own execution context, through the request's callback.
///
/// # Invariants
///
/// - `submit` either accepts the request (its callback then runs exactly
///   once) or returns it inside a [`SubmitError`] (its callback never runs)
/// - Accepted writes land at exactly the requested offset
/// - Writers must be `Send + Sync` so producers on any thread can submit
///
/// # Implementors
///
/// - [`super::FileDiskWriter`] - Writes to a file on a dedicated I/O thread
/// - [`super::InMemoryDiskWriter`] - For testing
pub trait AsyncDiskWriter: Send + Sync {
    /// Queues `request` for writing.
    ///
    /// # Errors
    ///
    /// Returns the request inside a [`SubmitError`] if it cannot be queued.
    fn submit(&self, request: WriteRequest) -> Result<(), SubmitError>;

    /// Syncs all completed writes and file metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&self) -> StorageResult<()>;
}
