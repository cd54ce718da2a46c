//! Channel statistics.
//!
//! Counters for monitoring a [`LogChannel`](crate::LogChannel).
//!
//! # Usage
//!
//! ```rust,ignore
//! let channel = LogChannel::create(Path::new("run.log"))?;
//! channel.append("started")?;
//!
//! let stats = channel.stats();
//! println!("Records: {}", stats.records_appended);
//! println!("Swaps: {}", stats.swaps);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Channel statistics.
///
/// All counters are atomic and can be read while producers are appending.
/// Values are monotonically increasing.
#[derive(Debug, Default)]
pub struct ChannelStats {
    /// Records copied into a buffer.
    records_appended: AtomicU64,
    /// Bytes copied into a buffer, newlines included.
    bytes_appended: AtomicU64,
    /// Records refused as too large.
    rejected_records: AtomicU64,
    /// Buffer swaps performed.
    swaps: AtomicU64,
    /// Bytes handed to the disk writer.
    bytes_submitted: AtomicU64,
    /// Writes reported complete, successful or not.
    writes_completed: AtomicU64,
    /// Writes reported failed.
    write_failures: AtomicU64,
}

impl ChannelStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_append(&self, bytes: usize) {
        self.records_appended.fetch_add(1, Ordering::Relaxed);
        self.bytes_appended.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected_records.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swap(&self) {
        self.swaps.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_submitted(&self, bytes: usize) {
        self.bytes_submitted.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_completion(&self, success: bool) {
        self.writes_completed.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            records_appended: self.records_appended.load(Ordering::Relaxed),
            bytes_appended: self.bytes_appended.load(Ordering::Relaxed),
            rejected_records: self.rejected_records.load(Ordering::Relaxed),
            swaps: self.swaps.load(Ordering::Relaxed),
            bytes_submitted: self.bytes_submitted.load(Ordering::Relaxed),
            writes_completed: self.writes_completed.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of channel statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Records copied into a buffer.
    pub records_appended: u64,
    /// Bytes copied into a buffer, newlines included.
    pub bytes_appended: u64,
    /// Records refused as too large.
    pub rejected_records: u64,
    /// Buffer swaps performed.
    pub swaps: u64,
    /// Bytes handed to the disk writer.
    pub bytes_submitted: u64,
    /// Writes reported complete, successful or not.
    pub writes_completed: u64,
    /// Writes reported failed.
    pub write_failures: u64,
}
