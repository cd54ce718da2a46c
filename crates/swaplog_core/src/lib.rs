//! # SwapLog Core
//!
//! Double-buffered, asynchronous append-only log channel.
//!
//! This crate provides:
//! - [`LogChannel`], which buffers newline-terminated records in one of two
//!   fixed-capacity buffers and hands full buffers to an asynchronous disk
//!   writer while producers keep appending to the other
//! - Completion tracking that keeps a buffer out of use until its write is done
//! - Timestamp sources for record prefixes
//! - Channel configuration and statistics
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use swaplog_core::{ChannelConfig, FixedTimestamp, LogChannel};
//! use swaplog_storage::InMemoryDiskWriter;
//!
//! let writer = Arc::new(InMemoryDiskWriter::new());
//! let channel = LogChannel::with_writer(
//!     writer.clone(),
//!     Arc::new(FixedTimestamp::new("ts ")),
//!     ChannelConfig::new().buffer_capacity(1024),
//! )
//! .unwrap();
//!
//! channel.append("hello").unwrap();
//! channel.append("world").unwrap();
//! channel.close().unwrap();
//!
//! assert_eq!(writer.data(), b"ts hello\nts world\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod completion;
mod config;
mod error;
mod stats;
mod timestamp;

pub use channel::LogChannel;
pub use config::{ChannelConfig, DEFAULT_BUFFER_CAPACITY};
pub use error::{ChannelError, ChannelResult};
pub use stats::{ChannelStats, StatsSnapshot};
pub use timestamp::{format_timestamp, FixedTimestamp, LocalClock, TimestampSource};

/// Appends a record tagged with the call site's file and line.
///
/// The record reads `File:<file> Line: <line> <message>` after the
/// channel's timestamp prefix.
///
/// ```rust,ignore
/// log_record!(channel, "connected to {}", addr)?;
/// ```
#[macro_export]
macro_rules! log_record {
    ($channel:expr, $($arg:tt)+) => {
        $channel.append_fmt(format_args!(
            "File:{} Line: {} {}",
            file!(),
            line!(),
            format_args!($($arg)+)
        ))
    };
}
