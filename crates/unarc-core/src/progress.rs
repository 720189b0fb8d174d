//! Progress instrumentation for extraction workers.
//!
//! A [`ProgressTracker`] is created per archive and wraps the byte streams
//! used for reading the archive and writing output files. Counters live
//! behind a mutex; subscribers only ever receive plain value snapshots, so
//! they can never observe a torn read and never block the workers by
//! holding a lock themselves.
//!
//! In the parallel case, updates use a non-blocking lock attempt: if
//! another worker is mid-update the notification is skipped rather than
//! queued. A few intermediate snapshots may be missed, but progress
//! reporting never becomes a serialization bottleneck. The final snapshot
//! with the completion flag set is always delivered exactly once.

use std::io::Read;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

/// One point-in-time view of an extraction's counters.
///
/// Plain value copy taken under the tracker's lock.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Archive the counters belong to.
    pub archive: Arc<PathBuf>,
    /// Expected total uncompressed size in bytes (0 if unknowable).
    pub total: u64,
    /// Compressed size of the archive in bytes (0 if unknowable).
    pub compressed: u64,
    /// Bytes written to output files so far.
    pub written: u64,
    /// Bytes read from the archive so far.
    pub read: u64,
    /// Output files completed so far.
    pub files: u64,
    /// Expected entry count (0 if unknowable).
    pub entries: u64,
    /// Set on the final snapshot, exactly once per archive.
    pub done: bool,
}

/// Subscriber outlet for [`Progress`] snapshots.
///
/// One internal event type with two delivery adapters: direct invocation
/// of a callback, or a message channel.
#[derive(Clone)]
pub enum ProgressSink {
    /// Snapshots are handed to this callback.
    Callback(Arc<dyn Fn(Progress) + Send + Sync>),
    /// Snapshots are pushed onto this channel.
    ///
    /// Intermediate snapshots are dropped when the channel is full; the
    /// final `done` snapshot uses a blocking send, so subscribers must
    /// keep draining until they see it.
    Channel(crossbeam_channel::Sender<Progress>),
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("ProgressSink::Callback"),
            Self::Channel(_) => f.write_str("ProgressSink::Channel"),
        }
    }
}

impl ProgressSink {
    fn deliver(&self, snapshot: Progress) {
        match self {
            Self::Callback(callback) => callback(snapshot),
            Self::Channel(sender) => {
                let _ = sender.try_send(snapshot);
            }
        }
    }

    fn deliver_final(&self, snapshot: Progress) {
        match self {
            Self::Callback(callback) => callback(snapshot),
            Self::Channel(sender) => {
                let _ = sender.send(snapshot);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    written: u64,
    read: u64,
    files: u64,
    done: bool,
}

/// Lock-guarded counter object shared by the workers of one archive.
#[derive(Debug)]
pub struct ProgressTracker {
    archive: Arc<PathBuf>,
    total: u64,
    compressed: u64,
    entries: u64,
    parallel: bool,
    sink: Option<ProgressSink>,
    counters: Mutex<Counters>,
}

impl ProgressTracker {
    /// Creates a tracker for one archive.
    ///
    /// `total`, `compressed`, and `entries` may be zero when the format
    /// cannot know them up front. `parallel` selects the non-blocking
    /// update policy used by concurrent file workers.
    #[must_use]
    pub fn new(
        archive: Arc<PathBuf>,
        sink: Option<ProgressSink>,
        total: u64,
        compressed: u64,
        entries: u64,
        parallel: bool,
    ) -> Self {
        Self {
            archive,
            total,
            compressed,
            entries,
            parallel,
            sink,
            counters: Mutex::new(Counters::default()),
        }
    }

    fn snapshot(&self, counters: &Counters) -> Progress {
        Progress {
            archive: Arc::clone(&self.archive),
            total: self.total,
            compressed: self.compressed,
            written: counters.written,
            read: counters.read,
            files: counters.files,
            entries: self.entries,
            done: counters.done,
        }
    }

    /// Applies `update` to the counters and publishes a snapshot.
    ///
    /// Sequential mode blocks on the lock; parallel mode skips the whole
    /// update when the lock is contended.
    fn update<F: FnOnce(&mut Counters)>(&self, update: F) {
        let snapshot = if self.parallel {
            match self.counters.try_lock() {
                Ok(mut counters) => {
                    update(&mut counters);
                    self.snapshot(&counters)
                }
                Err(_) => return,
            }
        } else {
            match self.counters.lock() {
                Ok(mut counters) => {
                    update(&mut counters);
                    self.snapshot(&counters)
                }
                Err(_) => return,
            }
        };
        // Delivery happens after the guard is dropped so a slow subscriber
        // cannot hold the counters.
        if let Some(sink) = &self.sink {
            sink.deliver(snapshot);
        }
    }

    /// Records bytes read from the archive.
    pub fn add_read(&self, bytes: u64) {
        self.update(|counters| counters.read += bytes);
    }

    /// Records bytes written to an output file.
    pub fn add_written(&self, bytes: u64) {
        self.update(|counters| counters.written += bytes);
    }

    /// Records one completed output file.
    pub fn file_done(&self) {
        self.update(|counters| counters.files += 1);
    }

    /// Publishes the final snapshot with the completion flag set.
    ///
    /// Always blocks on the lock regardless of the parallel policy, and is
    /// idempotent: only the first call delivers a snapshot.
    pub fn finish(&self) {
        let snapshot = {
            let Ok(mut counters) = self.counters.lock() else {
                return;
            };
            if counters.done {
                return;
            }
            counters.done = true;
            self.snapshot(&counters)
        };
        if let Some(sink) = &self.sink {
            sink.deliver_final(snapshot);
        }
    }

    /// Current written-bytes counter (blocking read).
    #[must_use]
    pub fn written(&self) -> u64 {
        self.counters.lock().map_or(0, |counters| counters.written)
    }
}

/// Reader wrapper that feeds the tracker's read counter.
pub struct CountingReader<R> {
    inner: R,
    tracker: Arc<ProgressTracker>,
}

impl<R: Read> CountingReader<R> {
    /// Wraps `inner`, attributing every byte read to `tracker`.
    pub fn new(inner: R, tracker: Arc<ProgressTracker>) -> Self {
        Self { inner, tracker }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.tracker.add_read(n as u64);
        }
        Ok(n)
    }
}

/// Writer wrapper that feeds the tracker's written counter.
pub struct CountingWriter<W> {
    inner: W,
    tracker: Arc<ProgressTracker>,
    local: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wraps `inner`, attributing every byte written to `tracker`.
    pub fn new(inner: W, tracker: Arc<ProgressTracker>) -> Self {
        Self {
            inner,
            tracker,
            local: 0,
        }
    }

    /// Bytes written through this wrapper, counted locally.
    ///
    /// Unlike the tracker's guarded counter this is exact even under the
    /// parallel skip-on-contention policy, so collaborators use it for
    /// the returned [`crate::Extraction::size`].
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.local
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        if n > 0 {
            self.local += n as u64;
            self.tracker.add_written(n as u64);
        }
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    fn tracker_with_channel(
        parallel: bool,
    ) -> (Arc<ProgressTracker>, crossbeam_channel::Receiver<Progress>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let tracker = Arc::new(ProgressTracker::new(
            Arc::new(PathBuf::from("a.zip")),
            Some(ProgressSink::Channel(tx)),
            100,
            40,
            3,
            parallel,
        ));
        (tracker, rx)
    }

    #[test]
    fn test_sequential_snapshot_per_write() {
        let (tracker, rx) = tracker_with_channel(false);
        tracker.add_written(10);
        tracker.add_written(5);
        tracker.file_done();
        tracker.finish();

        let snapshots: Vec<Progress> = rx.try_iter().collect();
        assert_eq!(snapshots.len(), 4);
        assert_eq!(snapshots[0].written, 10);
        assert_eq!(snapshots[1].written, 15);
        assert_eq!(snapshots[2].files, 1);
        assert!(snapshots[3].done);
        assert_eq!(snapshots[3].total, 100);
    }

    #[test]
    fn test_finish_delivered_exactly_once() {
        let (tracker, rx) = tracker_with_channel(true);
        tracker.finish();
        tracker.finish();
        let done_count = rx.try_iter().filter(|p| p.done).count();
        assert_eq!(done_count, 1);
    }

    #[test]
    fn test_callback_sink() {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let tracker = ProgressTracker::new(
            Arc::new(PathBuf::from("a.tar")),
            Some(ProgressSink::Callback(Arc::new(move |snapshot| {
                if snapshot.done {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            }))),
            0,
            0,
            0,
            false,
        );
        tracker.add_written(1);
        tracker.finish();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_counting_writer_exact_local_count() {
        let (tracker, _rx) = tracker_with_channel(true);
        let mut sink = Vec::new();
        let mut writer = CountingWriter::new(&mut sink, Arc::clone(&tracker));
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        assert_eq!(writer.total_bytes(), 11);
        assert_eq!(sink, b"hello world");
    }

    #[test]
    fn test_counting_reader() {
        let (tracker, rx) = tracker_with_channel(false);
        let mut reader = CountingReader::new(&b"abcdef"[..], Arc::clone(&tracker));
        let mut out = Vec::new();
        std::io::copy(&mut reader, &mut out).unwrap();
        tracker.finish();
        let last = rx.try_iter().last().unwrap();
        assert_eq!(last.read, 6);
    }
}
