//! File-backed asynchronous disk writer.

use crate::error::{StorageError, StorageResult};
use crate::writer::{AsyncDiskWriter, SubmitError, WriteRequest};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Name of the I/O thread that performs the writes.
const IO_THREAD_NAME: &str = "swaplog-io";

/// A disk writer that performs positioned writes on a dedicated I/O thread.
///
/// Requests are queued to the I/O thread, which writes each buffer at its
/// offset and then runs the request's completion callback on that thread.
/// Producers never wait on the disk.
///
/// # Exclusivity
///
/// The backing file is created with exclusive-create semantics and held
/// under an advisory exclusive lock for the writer's lifetime.
///
/// # Example
///
/// ```no_run
/// use swaplog_storage::{AsyncDiskWriter, FileDiskWriter, WriteRequest};
/// use std::path::Path;
///
/// let writer = FileDiskWriter::create_new(Path::new("run.log")).unwrap();
/// let request = WriteRequest::new(b"hello\n".to_vec(), 0, |outcome| {
///     assert_eq!(outcome.result.unwrap(), 6);
/// });
/// writer.submit(request).unwrap();
/// ```
#[derive(Debug)]
pub struct FileDiskWriter {
    path: PathBuf,
    file: Arc<File>,
    queue: Mutex<Option<Sender<WriteRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FileDiskWriter {
    /// Creates the backing file and starts the I/O thread.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the path exists,
    /// [`StorageError::Locked`] if another writer holds the file, or an
    /// I/O error if the file or thread cannot be created.
    pub fn create_new(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => StorageError::AlreadyExists {
                    path: path.to_path_buf(),
                },
                _ => StorageError::Io(e),
            })?;

        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: path.to_path_buf(),
            });
        }

        let file = Arc::new(file);
        let (tx, rx) = mpsc::channel();
        let worker_file = Arc::clone(&file);
        let worker = thread::Builder::new()
            .name(IO_THREAD_NAME.to_string())
            .spawn(move || run_worker(&worker_file, rx))?;

        tracing::debug!(path = %path.display(), "disk writer started");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Creates the backing file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot
    /// be created.
    pub fn create_new_with_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::create_new(path)
    }

    /// Returns the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stops accepting requests and waits for queued writes to finish.
    ///
    /// Called automatically on drop.
    pub fn shutdown(&self) {
        // Dropping the sender ends the worker loop once the queue drains.
        drop(self.queue.lock().take());
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::error!(path = %self.path.display(), "disk writer thread panicked");
            }
        }
    }
}

impl AsyncDiskWriter for FileDiskWriter {
    fn submit(&self, request: WriteRequest) -> Result<(), SubmitError> {
        let queue = self.queue.lock();
        match queue.as_ref() {
            Some(tx) => tx
                .send(request)
                .map_err(|rejected| SubmitError::new(StorageError::Closed, rejected.0)),
            None => Err(SubmitError::new(StorageError::Closed, request)),
        }
    }

    fn sync(&self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

impl Drop for FileDiskWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(file: &File, requests: Receiver<WriteRequest>) {
    for request in requests {
        let result = write_at(file, request.offset(), request.data());
        if let Err(e) = &result {
            tracing::error!(offset = request.offset(), len = request.len(), error = %e, "disk write failed");
        }
        request.complete(result);
    }
}

fn write_at(mut file: &File, offset: u64, data: &[u8]) -> StorageResult<usize> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)?;
    Ok(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriteOutcome;
    use tempfile::tempdir;

    fn submit_and_wait(writer: &FileDiskWriter, data: &[u8], offset: u64) -> WriteOutcome {
        let (tx, rx) = mpsc::channel();
        let request = WriteRequest::new(data.to_vec(), offset, move |outcome| {
            tx.send(outcome).unwrap();
        });
        writer.submit(request).unwrap();
        rx.recv().unwrap()
    }

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let writer = FileDiskWriter::create_new(&path).unwrap();
        assert!(path.exists());
        assert_eq!(writer.path(), path);
    }

    #[test]
    fn file_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, b"old").unwrap();

        let result = FileDiskWriter::create_new(&path);
        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
    }

    #[test]
    fn file_write_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");
        let writer = FileDiskWriter::create_new(&path).unwrap();

        let first = submit_and_wait(&writer, b"hello ", 0);
        assert_eq!(first.result.unwrap(), 6);
        assert_eq!(first.buffer, b"hello ");

        let second = submit_and_wait(&writer, b"world", 6);
        assert_eq!(second.result.unwrap(), 5);
        assert_eq!(second.offset, 6);

        writer.sync().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn file_write_at_offset_leaves_gap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");
        let writer = FileDiskWriter::create_new(&path).unwrap();

        submit_and_wait(&writer, b"end", 4).result.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"\0\0\0\0end");
    }

    #[test]
    fn file_completion_runs_on_io_thread() {
        let dir = tempdir().unwrap();
        let writer = FileDiskWriter::create_new(&dir.path().join("test.log")).unwrap();

        let (tx, rx) = mpsc::channel();
        let request = WriteRequest::new(b"x".to_vec(), 0, move |_| {
            tx.send(thread::current().name().map(str::to_string)).unwrap();
        });
        writer.submit(request).unwrap();

        assert_eq!(rx.recv().unwrap().as_deref(), Some(IO_THREAD_NAME));
    }

    #[test]
    fn file_submit_after_shutdown_returns_request() {
        let dir = tempdir().unwrap();
        let writer = FileDiskWriter::create_new(&dir.path().join("test.log")).unwrap();
        writer.shutdown();

        let err = writer
            .submit(WriteRequest::new(b"late".to_vec(), 0, |_| {}))
            .unwrap_err();
        assert!(matches!(err.error, StorageError::Closed));
        assert_eq!(err.request.into_buffer(), b"late");
    }

    #[test]
    fn file_shutdown_drains_queue() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");
        let writer = FileDiskWriter::create_new(&path).unwrap();

        for i in 0..10u64 {
            let request = WriteRequest::new(vec![b'a' + i as u8], i, |_| {});
            writer.submit(request).unwrap();
        }
        writer.shutdown();

        assert_eq!(std::fs::read(&path).unwrap(), b"abcdefghij");
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("path").join("test.log");

        let _writer = FileDiskWriter::create_new_with_dirs(&path).unwrap();
        assert!(path.exists());
    }
}
