//! # SwapLog Storage
//!
//! Asynchronous disk writers for SwapLog.
//!
//! This crate provides the lowest-level I/O abstraction for SwapLog. Writers
//! are **positioned byte sinks**: they accept a buffer and a file offset,
//! write it without blocking the submitter, and report completion through a
//! callback that runs on the writer's own execution context.
//!
//! ## Design Principles
//!
//! - Writers know nothing about records, timestamps, or buffer swapping
//! - A request owns its buffer until completion hands it back
//! - A refused submission returns the request untouched
//! - Must be `Send + Sync` for submission from any producer thread
//!
//! ## Available Writers
//!
//! - [`FileDiskWriter`] - Writes to an exclusively created file on an I/O thread
//! - [`InMemoryDiskWriter`] - For testing, with completion and fault control
//!
//! ## Example
//!
//! ```rust
//! use swaplog_storage::{AsyncDiskWriter, InMemoryDiskWriter, WriteRequest};
//!
//! let writer = InMemoryDiskWriter::new();
//! let request = WriteRequest::new(b"hello world\n".to_vec(), 0, |outcome| {
//!     assert_eq!(outcome.result.unwrap(), 12);
//! });
//! writer.submit(request).unwrap();
//! assert_eq!(writer.data(), b"hello world\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod writer;

pub use error::{StorageError, StorageResult};
pub use file::FileDiskWriter;
pub use memory::{InMemoryDiskWriter, Submission};
pub use writer::{AsyncDiskWriter, CompletionFn, SubmitError, WriteOutcome, WriteRequest};
