//! Per-call extraction descriptor and result types.

use std::path::PathBuf;
use std::sync::Arc;

use crate::progress::ProgressSink;

/// Default unix mode for extracted files.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Default unix mode for created directories.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Immutable-per-call descriptor for extracting one archive.
///
/// Owned by the caller. The password retry loop derives a fresh copy per
/// attempt (see [`crate::api::extract_file`]), so retries never share
/// mutable state and collaborators never mutate the caller's request.
///
/// # Examples
///
/// ```no_run
/// use unarc_core::ExtractionRequest;
/// use std::path::PathBuf;
///
/// let request = ExtractionRequest {
///     source: PathBuf::from("bundle.tar.gz"),
///     output_dir: PathBuf::from("/tmp/out"),
///     ..ExtractionRequest::default()
/// };
/// let extraction = unarc_core::extract_file(&request)?;
/// println!("wrote {} bytes", extraction.size);
/// # Ok::<(), unarc_core::ExtractError>(())
/// ```
#[derive(Clone, Default)]
pub struct ExtractionRequest {
    /// Path to the archive file.
    pub source: PathBuf,
    /// Directory extracted entries are written under.
    pub output_dir: PathBuf,
    /// Unix mode applied to extracted files (0 = [`DEFAULT_FILE_MODE`]).
    pub file_mode: u32,
    /// Unix mode applied to created directories (0 = [`DEFAULT_DIR_MODE`]).
    pub dir_mode: u32,
    /// Password for this specific attempt, if any.
    pub password: Option<String>,
    /// Ordered password list tried by [`crate::api::extract_file`].
    pub passwords: Vec<String>,
    /// Number of intra-archive file workers (0 or 1 = sequential).
    pub file_workers: usize,
    /// Progress snapshot subscriber, shared with the tracker.
    pub progress: Option<ProgressSink>,
}

impl std::fmt::Debug for ExtractionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionRequest")
            .field("source", &self.source)
            .field("output_dir", &self.output_dir)
            .field("file_mode", &format_args!("{:#o}", self.file_mode))
            .field("dir_mode", &format_args!("{:#o}", self.dir_mode))
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("passwords", &self.passwords.len())
            .field("file_workers", &self.file_workers)
            .finish_non_exhaustive()
    }
}

impl ExtractionRequest {
    /// Effective file mode, substituting the default for an unset (zero)
    /// value.
    #[must_use]
    pub fn file_mode(&self) -> u32 {
        if self.file_mode == 0 {
            DEFAULT_FILE_MODE
        } else {
            self.file_mode
        }
    }

    /// Effective directory mode.
    #[must_use]
    pub fn dir_mode(&self) -> u32 {
        if self.dir_mode == 0 {
            DEFAULT_DIR_MODE
        } else {
            self.dir_mode
        }
    }

    /// Derives an independent copy for one password attempt.
    ///
    /// The copy carries exactly one candidate password and shares only the
    /// progress sink (which is designed for concurrent publication).
    #[must_use]
    pub fn with_password(&self, password: Option<&str>) -> Self {
        Self {
            password: password.map(str::to_owned),
            passwords: Vec::new(),
            ..self.clone()
        }
    }

    /// Source path as a shared handle for progress snapshots.
    #[must_use]
    pub fn source_handle(&self) -> Arc<PathBuf> {
        Arc::new(self.source.clone())
    }
}

/// Outcome of one extraction call. Immutable after return.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Total bytes written to disk.
    pub size: u64,
    /// Output file paths in write order.
    pub files: Vec<PathBuf>,
    /// Archive/volume files actually consumed.
    ///
    /// Formats without native multi-volume support report the single
    /// input file here.
    pub archives: Vec<PathBuf>,
    /// Non-fatal notes gathered along the way, such as entry kinds that
    /// were skipped rather than materialized.
    pub warnings: Vec<String>,
}

impl Extraction {
    /// Merges another extraction into this one, preserving write order.
    pub fn absorb(&mut self, other: Self) {
        self.size += other.size;
        self.files.extend(other.files);
        self.archives.extend(other.archives);
        self.warnings.extend(other.warnings);
    }
}
