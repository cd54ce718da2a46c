//! Concurrent producers against writers that complete on another thread.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use swaplog_core::{ChannelConfig, FixedTimestamp, LogChannel};
use swaplog_storage::{AsyncDiskWriter, StorageResult, SubmitError, WriteRequest};
use tempfile::tempdir;

/// Completes each write on its own thread after a delay and records
/// whether two writes were ever outstanding at once.
#[derive(Default)]
struct SlowWriter {
    image: Arc<Mutex<Vec<u8>>>,
    outstanding: Arc<AtomicUsize>,
    max_outstanding: Arc<AtomicUsize>,
    submissions: AtomicUsize,
}

impl AsyncDiskWriter for SlowWriter {
    fn submit(&self, request: WriteRequest) -> Result<(), SubmitError> {
        let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_outstanding.fetch_max(now, Ordering::SeqCst);
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let image = Arc::clone(&self.image);
        let outstanding = Arc::clone(&self.outstanding);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(2));
            let start = request.offset() as usize;
            let end = start + request.len();
            {
                let mut image = image.lock();
                if image.len() < end {
                    image.resize(end, 0);
                }
                image[start..end].copy_from_slice(request.data());
            }
            let len = request.len();
            outstanding.fetch_sub(1, Ordering::SeqCst);
            request.complete(Ok(len));
        });
        Ok(())
    }

    fn sync(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[test]
fn at_most_one_write_outstanding() {
    let writer = Arc::new(SlowWriter::default());
    let channel = LogChannel::with_writer(
        Arc::clone(&writer) as Arc<dyn AsyncDiskWriter>,
        Arc::new(FixedTimestamp::new("")),
        ChannelConfig::new().buffer_capacity(32),
    )
    .unwrap();

    for i in 0..200 {
        channel.append_record(format!("line {i:04}").as_bytes()).unwrap();
    }
    channel.close().unwrap();

    assert_eq!(writer.max_outstanding.load(Ordering::SeqCst), 1);
    assert!(writer.submissions.load(Ordering::SeqCst) > 1);

    let image = writer.image.lock().clone();
    let contents = String::from_utf8(image).unwrap();
    let expected: Vec<String> = (0..200).map(|i| format!("line {i:04}")).collect();
    assert_eq!(contents.lines().collect::<Vec<_>>(), expected);
}

#[test]
fn concurrent_producers_lose_nothing() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let writer = Arc::new(SlowWriter::default());
    let channel = Arc::new(
        LogChannel::with_writer(
            Arc::clone(&writer) as Arc<dyn AsyncDiskWriter>,
            Arc::new(FixedTimestamp::new("")),
            ChannelConfig::new().buffer_capacity(256),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    channel.append(&format!("{t}:{i}")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    channel.close().unwrap();
    assert_eq!(writer.max_outstanding.load(Ordering::SeqCst), 1);

    let image = writer.image.lock().clone();
    let contents = String::from_utf8(image).unwrap();

    // Each producer's records appear once each, in that producer's order.
    let mut next: HashMap<usize, usize> = HashMap::new();
    let mut total = 0;
    for line in contents.lines() {
        let (t, i) = line.split_once(':').unwrap();
        let t: usize = t.parse().unwrap();
        let i: usize = i.parse().unwrap();
        let expected = next.entry(t).or_insert(0);
        assert_eq!(i, *expected, "producer {t} out of order");
        *expected += 1;
        total += 1;
    }
    assert_eq!(total, THREADS * PER_THREAD);
    assert!(next.values().all(|&n| n == PER_THREAD));
}

#[test]
fn concurrent_producers_to_file() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 2_000;

    let dir = tempdir().unwrap();
    let path = dir.path().join("run.log");
    let config = ChannelConfig::new().buffer_capacity(4096);
    let channel = Arc::new(LogChannel::create_with_config(&path, config).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    channel.append(&format!("producer {t} event {i}")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    channel.close().unwrap();

    let stats = channel.stats();
    assert_eq!(stats.records_appended, (THREADS * PER_THREAD) as u64);
    assert_eq!(stats.write_failures, 0);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.len() as u64, stats.bytes_appended);
    assert_eq!(contents.lines().count(), THREADS * PER_THREAD);
}
