//! In-memory disk writer for testing.

use crate::error::{StorageError, StorageResult};
use crate::writer::{AsyncDiskWriter, SubmitError, WriteRequest};
use parking_lot::Mutex;

/// A write accepted by [`InMemoryDiskWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    /// Requested file offset.
    pub offset: u64,
    /// Requested length in bytes.
    pub len: usize,
}

/// An in-memory disk writer.
///
/// Writes land in a byte image at the requested offset. By default each
/// write completes immediately on the submitting thread; with
/// [`hold_completions`](Self::hold_completions) accepted requests are parked
/// until [`release_completions`](Self::release_completions) runs them, which
/// lets tests observe a write that is still in flight.
///
/// Suitable for:
/// - Unit tests of the buffer swap protocol
/// - Fault injection (refused submissions, failed writes)
///
/// # Example
///
/// ```rust
/// use swaplog_storage::{AsyncDiskWriter, InMemoryDiskWriter, WriteRequest};
///
/// let writer = InMemoryDiskWriter::new();
/// writer.submit(WriteRequest::new(b"test\n".to_vec(), 0, |_| {})).unwrap();
/// assert_eq!(writer.data(), b"test\n");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDiskWriter {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    data: Vec<u8>,
    submissions: Vec<Submission>,
    held: Vec<WriteRequest>,
    hold: bool,
    fail_next_submit: bool,
    fail_next_write: bool,
    syncs: usize,
}

impl Inner {
    fn write(&mut self, request: &WriteRequest) -> StorageResult<usize> {
        if std::mem::take(&mut self.fail_next_write) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            )));
        }

        let start = usize::try_from(request.offset())
            .map_err(|_| StorageError::Rejected("offset exceeds address space".to_string()))?;
        let end = start + request.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(request.data());
        Ok(request.len())
    }
}

impl InMemoryDiskWriter {
    /// Creates a new writer with an empty image.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the written image.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.inner.lock().data.clone()
    }

    /// Returns every accepted submission in submission order.
    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        self.inner.lock().submissions.clone()
    }

    /// Returns the number of accepted writes whose completion is parked.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.lock().held.len()
    }

    /// Returns how many times [`AsyncDiskWriter::sync`] was called.
    #[must_use]
    pub fn sync_count(&self) -> usize {
        self.inner.lock().syncs
    }

    /// Parks completions of subsequently accepted writes.
    pub fn hold_completions(&self) {
        self.inner.lock().hold = true;
    }

    /// Performs all parked writes, runs their callbacks on the calling
    /// thread, and resumes immediate completion.
    ///
    /// Returns the number of completions delivered.
    pub fn release_completions(&self) -> usize {
        let held = {
            let mut inner = self.inner.lock();
            inner.hold = false;
            std::mem::take(&mut inner.held)
        };

        let count = held.len();
        for request in held {
            let result = self.inner.lock().write(&request);
            request.complete(result);
        }
        count
    }

    /// Makes the next submission fail without being accepted.
    pub fn fail_next_submit(&self) {
        self.inner.lock().fail_next_submit = true;
    }

    /// Makes the next accepted write complete with an I/O error.
    pub fn fail_next_write(&self) {
        self.inner.lock().fail_next_write = true;
    }
}

impl AsyncDiskWriter for InMemoryDiskWriter {
    fn submit(&self, request: WriteRequest) -> Result<(), SubmitError> {
        let result = {
            let mut inner = self.inner.lock();
            if std::mem::take(&mut inner.fail_next_submit) {
                return Err(SubmitError::new(
                    StorageError::Rejected("injected submission failure".to_string()),
                    request,
                ));
            }

            inner.submissions.push(Submission {
                offset: request.offset(),
                len: request.len(),
            });

            if inner.hold {
                inner.held.push(request);
                return Ok(());
            }
            inner.write(&request)
        };

        // The callback runs without our lock held.
        request.complete(result);
        Ok(())
    }

    fn sync(&self) -> StorageResult<()> {
        self.inner.lock().syncs += 1;
        Ok(())
    }
}
