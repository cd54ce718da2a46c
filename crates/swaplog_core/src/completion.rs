//! Tracking of the single in-flight buffer write.

use crate::error::{ChannelError, ChannelResult};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use swaplog_storage::{StorageError, WriteOutcome};

/// Holds the idle buffer and the in-flight flag shared with the writer's
/// completion callback.
///
/// At most one write is outstanding. While it is, the idle buffer is owned
/// by the write request; the completion hands it back here, clears the flag
/// and wakes any producer blocked in [`wait_idle`](Self::wait_idle).
#[derive(Debug)]
pub(crate) struct CompletionTracker {
    in_flight: AtomicBool,
    slot: Mutex<Slot>,
    done: Condvar,
}

#[derive(Debug)]
struct Slot {
    spare: Option<Vec<u8>>,
    failure: Option<(u64, StorageError)>,
    released: bool,
}

impl CompletionTracker {
    pub(crate) fn new(spare: Vec<u8>) -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            slot: Mutex::new(Slot {
                spare: Some(spare),
                failure: None,
                released: false,
            }),
            done: Condvar::new(),
        }
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Marks a write as outstanding. Must precede the submission, since a
    /// writer may complete the request before `submit` returns.
    pub(crate) fn begin(&self) {
        self.in_flight.store(true, Ordering::Release);
    }

    /// Clears the flag after the writer refused a submission.
    pub(crate) fn abort(&self) {
        let _slot = self.slot.lock();
        self.in_flight.store(false, Ordering::Release);
        self.done.notify_all();
    }

    /// Completion callback body. Runs on the writer's thread.
    pub(crate) fn complete(&self, outcome: WriteOutcome) {
        let WriteOutcome {
            mut buffer,
            offset,
            result,
        } = outcome;

        let mut slot = self.slot.lock();
        match result {
            Ok(written) => tracing::debug!(offset, written, "buffer write completed"),
            Err(e) => {
                tracing::error!(offset, error = %e, "buffer write failed");
                slot.failure = Some((offset, e));
            }
        }
        if !slot.released {
            buffer.clear();
            slot.spare = Some(buffer);
        }
        self.in_flight.store(false, Ordering::Release);
        self.done.notify_all();
    }

    /// Blocks until no write is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::WriteTimeout`] if `timeout` elapses first.
    pub(crate) fn wait_idle(&self, timeout: Option<Duration>) -> ChannelResult<()> {
        let mut slot = self.slot.lock();
        let deadline = timeout.map(|t| Instant::now() + t);

        while self.in_flight.load(Ordering::Acquire) {
            match deadline {
                Some(deadline) => {
                    if self.done.wait_until(&mut slot, deadline).timed_out()
                        && self.in_flight.load(Ordering::Acquire)
                    {
                        let waited = timeout.unwrap_or_default();
                        tracing::warn!(?waited, "timed out waiting for in-flight write");
                        return Err(ChannelError::WriteTimeout { waited });
                    }
                }
                None => self.done.wait(&mut slot),
            }
        }
        Ok(())
    }

    /// Takes the failure reported by the last completed write, if any.
    pub(crate) fn take_failure(&self) -> Option<(u64, StorageError)> {
        self.slot.lock().failure.take()
    }

    /// Takes the idle buffer. Only valid after [`wait_idle`](Self::wait_idle).
    pub(crate) fn take_spare(&self) -> Option<Vec<u8>> {
        self.slot.lock().spare.take()
    }

    /// Returns the idle buffer after a refused submission.
    pub(crate) fn restore_spare(&self, buffer: Vec<u8>) {
        self.slot.lock().spare = Some(buffer);
    }

    /// Frees the idle buffer and drops any buffer returned later.
    pub(crate) fn release(&self) {
        let mut slot = self.slot.lock();
        slot.released = true;
        slot.spare = None;
    }
}
