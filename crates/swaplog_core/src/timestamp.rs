//! Timestamp prefixes for log records.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};

/// Produces the timestamp prefix written in front of every record.
///
/// Called once per record, immediately before the record is formatted.
/// The returned string should not contain a newline; the channel replaces
/// any it finds with a space.
pub trait TimestampSource: Send + Sync {
    /// Returns the prefix for a record being written now.
    fn now(&self) -> String;
}

impl<F> TimestampSource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn now(&self) -> String {
        self()
    }
}

/// Local wall-clock time in the form `2024_3_7 9:5:2.34  `.
///
/// Fields are not zero padded; the fraction is centiseconds. Two spaces
/// separate the timestamp from the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl TimestampSource for LocalClock {
    fn now(&self) -> String {
        format_timestamp(&Local::now().naive_local())
    }
}

/// A constant prefix, for tests and benchmarks.
#[derive(Debug, Clone, Default)]
pub struct FixedTimestamp(pub String);

impl FixedTimestamp {
    /// Creates a source that always returns `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }
}

impl TimestampSource for FixedTimestamp {
    fn now(&self) -> String {
        self.0.clone()
    }
}

/// Formats `time` the way [`LocalClock`] does.
pub fn format_timestamp(time: &NaiveDateTime) -> String {
    // Leap seconds report nanoseconds past one second.
    let centis = (time.nanosecond() / 10_000_000).min(99);
    format!(
        "{}_{}_{} {}:{}:{}.{}  ",
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second(),
        centis
    )
}
