//! The double-buffered log channel.

use crate::completion::CompletionTracker;
use crate::config::ChannelConfig;
use crate::error::{ChannelError, ChannelResult};
use crate::stats::{ChannelStats, StatsSnapshot};
use crate::timestamp::{LocalClock, TimestampSource};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use swaplog_storage::{AsyncDiskWriter, FileDiskWriter, SubmitError, WriteRequest};

/// Record delimiter appended after every record.
const RECORD_DELIMITER: u8 = b'\n';

/// State guarded by the channel lock.
struct ChannelState {
    /// Buffer accepting appends. Its length is the used size.
    active: Vec<u8>,
    /// Where the next flushed buffer lands in the file.
    file_offset: u64,
    closed: bool,
}

/// An append-only log writer that never makes producers wait on the disk
/// unless both buffers are busy.
///
/// The channel owns two buffers of equal capacity. Producers append
/// newline-terminated records to the active buffer under a lock. When a
/// record does not fit, the full buffer is handed to the disk writer and
/// the other buffer becomes active. A buffer only becomes active again once
/// the write that drained it has completed, and only one write is
/// outstanding at a time.
///
/// # Thread Safety
///
/// `LogChannel` is `Send + Sync`; share it across producer threads with an
/// `Arc`. Records are laid out in the order producers acquire the lock.
///
/// # Example
///
/// ```no_run
/// use swaplog_core::LogChannel;
/// use std::path::Path;
///
/// let channel = LogChannel::create(Path::new("run.log")).unwrap();
/// channel.append("hello").unwrap();
/// channel.append("world").unwrap();
/// channel.close().unwrap();
/// ```
pub struct LogChannel {
    writer: Arc<dyn AsyncDiskWriter>,
    clock: Arc<dyn TimestampSource>,
    config: ChannelConfig,
    state: Mutex<ChannelState>,
    tracker: Arc<CompletionTracker>,
    stats: Arc<ChannelStats>,
    path: Option<PathBuf>,
}

impl LogChannel {
    /// Creates a channel writing to a new file at `path` with default
    /// configuration and local-time timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::AlreadyExists`] if the path exists,
    /// [`ChannelError::OutOfMemory`] if the buffers cannot be allocated,
    /// or an I/O error if the file cannot be created.
    pub fn create(path: &Path) -> ChannelResult<Self> {
        Self::create_with_config(path, ChannelConfig::default())
    }

    /// Creates a channel writing to a new file at `path`.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create); additionally fails with
    /// [`ChannelError::InvalidConfig`] before touching the filesystem.
    pub fn create_with_config(path: &Path, config: ChannelConfig) -> ChannelResult<Self> {
        config.validate()?;

        let writer = if config.create_parent_dirs {
            FileDiskWriter::create_new_with_dirs(path)?
        } else {
            FileDiskWriter::create_new(path)?
        };

        let mut channel = Self::with_writer(Arc::new(writer), Arc::new(LocalClock), config)?;
        channel.path = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            capacity = channel.config.buffer_capacity,
            "log channel opened"
        );
        Ok(channel)
    }

    /// Creates a channel over an arbitrary disk writer and timestamp source.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidConfig`] or
    /// [`ChannelError::OutOfMemory`].
    pub fn with_writer(
        writer: Arc<dyn AsyncDiskWriter>,
        clock: Arc<dyn TimestampSource>,
        config: ChannelConfig,
    ) -> ChannelResult<Self> {
        config.validate()?;

        let active = allocate_buffer(config.buffer_capacity)?;
        let spare = allocate_buffer(config.buffer_capacity)?;

        Ok(Self {
            writer,
            clock,
            config,
            state: Mutex::new(ChannelState {
                active,
                file_offset: 0,
                closed: false,
            }),
            tracker: Arc::new(CompletionTracker::new(spare)),
            stats: Arc::new(ChannelStats::new()),
            path: None,
        })
    }

    /// Appends `payload` prefixed with the current timestamp.
    ///
    /// # Errors
    ///
    /// See [`append_record`](Self::append_record).
    pub fn append(&self, payload: &str) -> ChannelResult<()> {
        let mut record = self.timestamp();
        record.push_str(payload);
        self.append_record(record.as_bytes())
    }

    /// Appends formatted arguments prefixed with the current timestamp.
    ///
    /// # Errors
    ///
    /// See [`append_record`](Self::append_record).
    pub fn append_fmt(&self, args: fmt::Arguments<'_>) -> ChannelResult<()> {
        let mut record = self.timestamp();
        record.push_str(&fmt::format(args));
        self.append_record(record.as_bytes())
    }

    /// Appends an already formatted record and a trailing newline.
    ///
    /// If the active buffer cannot hold the record, the buffer is submitted
    /// to the disk writer and appends continue in the other buffer. That
    /// swap blocks until the previously submitted write has completed.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::UseAfterClose`] after [`close`](Self::close), checked
    ///   before anything else
    /// - [`ChannelError::RecordTooLarge`] if `record.len() + 1` exceeds the
    ///   buffer capacity; nothing is changed
    /// - [`ChannelError::WriteSubmission`] if the full buffer could not be
    ///   submitted; buffered data is kept and the record is not appended
    /// - [`ChannelError::WriteFailed`] if the previous write failed; reported
    ///   once, the record is not appended
    /// - [`ChannelError::WriteTimeout`] if the previous write did not
    ///   complete in time
    pub fn append_record(&self, record: &[u8]) -> ChannelResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ChannelError::UseAfterClose);
        }

        let capacity = self.config.buffer_capacity;
        let needed = record.len().saturating_add(1);
        if needed > capacity {
            self.stats.record_rejected();
            return Err(ChannelError::RecordTooLarge {
                len: record.len(),
                capacity,
            });
        }

        if state.active.len() + needed > capacity {
            self.swap(&mut state)?;
        }

        state.active.extend_from_slice(record);
        state.active.push(RECORD_DELIMITER);
        self.stats.record_append(needed);
        Ok(())
    }

    /// Flushes the remaining buffered bytes, waits for the write to complete
    /// and releases both buffers.
    ///
    /// An empty tail issues no write. Close ignores
    /// [`write_timeout`](ChannelConfig::write_timeout()) and blocks until every
    /// submitted write has completed. The channel is closed and its buffers
    /// released even when this returns an error.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::UseAfterClose`] if already closed, or the
    /// failure of the final (or a still unreported earlier) write.
    pub fn close(&self) -> ChannelResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ChannelError::UseAfterClose);
        }
        state.closed = true;

        let result = self.flush_tail(&mut state).and_then(|()| {
            if self.config.sync_on_close {
                self.writer.sync()?;
            }
            Ok(())
        });

        self.tracker.release();
        state.active = Vec::new();

        match &result {
            Ok(()) => tracing::info!(
                path = ?self.path,
                bytes = state.file_offset,
                "log channel closed"
            ),
            Err(e) => tracing::warn!(path = ?self.path, error = %e, "log channel closed with error"),
        }
        result
    }

    /// Returns true once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Capacity of each buffer in bytes.
    pub fn capacity(&self) -> usize {
        self.config.buffer_capacity
    }

    /// Bytes currently held in the active buffer.
    pub fn buffered_len(&self) -> usize {
        self.state.lock().active.len()
    }

    /// File offset where the next flushed buffer will be written.
    pub fn file_offset(&self) -> u64 {
        self.state.lock().file_offset
    }

    /// Returns true while a submitted write has not completed.
    pub fn is_write_in_flight(&self) -> bool {
        self.tracker.is_in_flight()
    }

    /// Path of the backing file, if the channel created one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Returns a snapshot of the channel counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Timestamp prefix with newlines replaced by spaces. A record always
    /// occupies exactly one line.
    fn timestamp(&self) -> String {
        let stamp = self.clock.now();
        if stamp.contains(RECORD_DELIMITER as char) {
            tracing::warn!(timestamp = %stamp.escape_debug(), "timestamp contains a newline");
            return stamp.replace(RECORD_DELIMITER as char, " ");
        }
        stamp
    }

    /// Hands the active buffer to the writer and activates the idle one.
    fn swap(&self, state: &mut ChannelState) -> ChannelResult<()> {
        self.tracker.wait_idle(self.config.write_timeout)?;
        if let Some((offset, source)) = self.tracker.take_failure() {
            return Err(ChannelError::WriteFailed { offset, source });
        }
        let spare = self
            .tracker
            .take_spare()
            .ok_or(ChannelError::UseAfterClose)?;

        let full = std::mem::replace(&mut state.active, spare);
        let len = full.len();
        let offset = state.file_offset;

        match self.submit(full, offset) {
            Ok(()) => {
                state.file_offset += len as u64;
                self.stats.record_swap();
                tracing::debug!(offset, len, "buffer swapped");
                Ok(())
            }
            Err(SubmitError { error, request }) => {
                let spare = std::mem::replace(&mut state.active, request.into_buffer());
                self.tracker.restore_spare(spare);
                tracing::warn!(offset, len, error = %error, "buffer submission refused");
                Err(ChannelError::WriteSubmission(error))
            }
        }
    }

    /// Writes out whatever the active buffer holds and waits for it.
    /// Waits without a timeout: close never returns before the tail is written.
    fn flush_tail(&self, state: &mut ChannelState) -> ChannelResult<()> {
        self.tracker.wait_idle(None)?;
        let earlier = self.tracker.take_failure();

        let tail = std::mem::take(&mut state.active);
        if !tail.is_empty() {
            let len = tail.len();
            let offset = state.file_offset;
            if let Err(SubmitError { error, .. }) = self.submit(tail, offset) {
                tracing::warn!(offset, len, error = %error, "final flush refused");
                return Err(ChannelError::WriteSubmission(error));
            }
            state.file_offset += len as u64;

            self.tracker.wait_idle(None)?;
            if let Some((offset, source)) = self.tracker.take_failure() {
                return Err(ChannelError::WriteFailed { offset, source });
            }
        }

        match earlier {
            Some((offset, source)) => Err(ChannelError::WriteFailed { offset, source }),
            None => Ok(()),
        }
    }

    fn submit(&self, buffer: Vec<u8>, offset: u64) -> Result<(), SubmitError> {
        let len = buffer.len();
        let tracker = Arc::clone(&self.tracker);
        let stats = Arc::clone(&self.stats);
        let request = WriteRequest::new(buffer, offset, move |outcome| {
            stats.record_completion(outcome.result.is_ok());
            tracker.complete(outcome);
        });

        self.tracker.begin();
        match self.writer.submit(request) {
            Ok(()) => {
                self.stats.record_submitted(len);
                Ok(())
            }
            Err(e) => {
                self.tracker.abort();
                Err(e)
            }
        }
    }
}

impl fmt::Debug for LogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogChannel")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Drop for LogChannel {
    fn drop(&mut self) {
        if self.state.get_mut().closed {
            return;
        }
        if let Err(e) = self.close() {
            tracing::warn!(path = ?self.path, error = %e, "failed to close log channel on drop");
        }
    }
}

fn allocate_buffer(capacity: usize) -> ChannelResult<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(capacity)
        .map_err(|_| ChannelError::OutOfMemory { capacity })?;
    Ok(buffer)
}
