//! Job descriptions and their notification plumbing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::ExtractError;
use crate::discover::ArchiveList;
use crate::discover::Filter;
use crate::progress::ProgressSink;

/// One caller-submitted unit of recursive, directory-scoped extraction
/// work.
///
/// A job is consumed exactly once by exactly one queue worker. After
/// submission the caller must not touch it; the worker reports back
/// through the job's own [`Notifier`].
#[derive(Clone, Default)]
pub struct Job {
    /// Directory to search for archives.
    pub root: PathBuf,
    /// Explicit output directory. When unset, output goes to a temporary
    /// directory derived from `root` and is relocated afterwards.
    pub output: Option<PathBuf>,
    /// Discovery filters applied to the initial scan.
    pub filter: Filter,
    /// Passwords to try, in order, against encrypted archives.
    pub passwords: Vec<String>,
    /// Unix mode for extracted files (0 = default).
    pub file_mode: u32,
    /// Unix mode for created directories (0 = default).
    pub dir_mode: u32,
    /// Intra-archive file workers for formats that support them.
    pub file_workers: usize,
    /// Keep the temporary output folder instead of relocating files back
    /// into the search root.
    pub keep_temp: bool,
    /// Delete every consumed archive after a fully successful job.
    pub delete_originals: bool,
    /// Do not re-scan extracted output for nested archives.
    pub no_recurse: bool,
    /// Recurse into archives revealed by an ISO image. Disc images
    /// routinely carry many same-named small archives that are not meant
    /// to be unpacked, so this defaults to off.
    pub allow_iso_recursion: bool,
    /// Allow relocation to overwrite existing files.
    pub overwrite: bool,
    /// Write a JSON manifest of inputs, outputs, and timing into the
    /// output area.
    pub log_file: bool,
    /// Where the two per-job [`Response`] values are delivered.
    pub notifier: Option<Notifier>,
    /// Low-level progress snapshots, shared by every archive in the job.
    pub progress: Option<ProgressSink>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("root", &self.root)
            .field("output", &self.output)
            .field("filter", &self.filter)
            .field("passwords", &format!("[{} redacted]", self.passwords.len()))
            .field("keep_temp", &self.keep_temp)
            .field("delete_originals", &self.delete_originals)
            .field("no_recurse", &self.no_recurse)
            .field("allow_iso_recursion", &self.allow_iso_recursion)
            .field("overwrite", &self.overwrite)
            .field("log_file", &self.log_file)
            .finish_non_exhaustive()
    }
}

/// Delivery adapter for job notifications.
///
/// One event shape, two transports. The channel variant uses a blocking
/// send: finish notifications must not be dropped, and the queue's stop
/// guarantee depends on them arriving.
#[derive(Clone)]
pub enum Notifier {
    /// Direct invocation on the worker thread.
    Callback(Arc<dyn Fn(Response) + Send + Sync>),
    /// Delivery onto a caller-owned channel.
    Channel(crossbeam_channel::Sender<Response>),
}

impl Notifier {
    /// Delivers one response. A disconnected channel receiver means the
    /// caller stopped listening; that is their prerogative, not an error.
    pub(crate) fn deliver(&self, response: Response) {
        match self {
            Self::Callback(callback) => callback(response),
            Self::Channel(sender) => drop(sender.send(response)),
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Notifier::Callback"),
            Self::Channel(_) => f.write_str("Notifier::Channel"),
        }
    }
}

/// Status report emitted twice per job: once when work starts and once
/// when it ends.
///
/// The start and finish values are independent allocations. The worker
/// never mutates a response after delivering it, so the caller may hold
/// the start value for as long as it likes.
#[derive(Debug, Default)]
pub struct Response {
    /// False for the start notification, true for the finish one.
    pub done: bool,
    /// Search root the job was submitted with.
    pub root: PathBuf,
    /// Output area for this job.
    pub output: PathBuf,
    /// Queue depth observed when the job was picked up (start only).
    pub queue_depth: usize,
    /// Archives found by the initial discovery scan.
    pub archives: ArchiveList,
    /// Nested archives revealed and consumed by recursion (finish only).
    pub extras: ArchiveList,
    /// Total bytes written (finish only).
    pub size: u64,
    /// Every file written, in write order (finish only).
    pub files: Vec<PathBuf>,
    /// Wall-clock duration of the job (finish only).
    pub elapsed: Duration,
    /// Non-fatal warnings gathered during extraction, such as skipped
    /// entry kinds and skipped ISO images (finish only).
    pub warnings: Vec<String>,
    /// Terminal error, if the job failed.
    pub error: Option<ExtractError>,
}

impl Response {
    /// True when the job finished without error.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.done && self.error.is_none()
    }
}
