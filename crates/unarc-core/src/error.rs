//! Error types for extraction and queue operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::formats::detect::ArchiveType;

/// Result type alias using `ExtractError`.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors surfaced by extraction, discovery, and queue operations.
///
/// Lower layers never log; they return these values wrapped with enough
/// context for the caller to test for the root cause through
/// [`std::error::Error::source`].
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither the suffix table nor signature sniffing recognized the file.
    #[error("unknown archive type: {}", path.display())]
    UnknownArchiveType {
        /// The file that could not be identified.
        path: PathBuf,
    },

    /// An archive entry resolves outside the output root.
    #[error("invalid path in archive: {}", path.display())]
    InvalidPath {
        /// The offending entry name as stored in the archive.
        path: PathBuf,
    },

    /// Archive header is malformed or the decoder rejected the stream.
    #[error("invalid archive header: {0}")]
    InvalidHead(String),

    /// Discovery found no archives under the search root.
    #[error("no compressed files found in {}", root.display())]
    NoCompressedFiles {
        /// The search root that was scanned.
        root: PathBuf,
    },

    /// Submission attempted while the queue is not running.
    #[error("queue is not running")]
    QueueStopped,

    /// Start attempted while the queue is already running.
    #[error("queue is already running")]
    QueueRunning,

    /// The supplied password was rejected by the archive.
    ///
    /// Distinguished from other failures so the retry loop can continue
    /// with the remaining passwords instead of aborting early.
    #[error("wrong password")]
    WrongPassword,

    /// Every configured password was rejected.
    #[error("used password {tried} of {total}, extraction failed")]
    PasswordExhausted {
        /// Index (1-based) of the last password attempted.
        tried: usize,
        /// Total number of passwords configured.
        total: usize,
        /// Failure from the final attempt.
        #[source]
        cause: Box<ExtractError>,
    },

    /// A basename exceeds the filesystem limit and could not be shortened
    /// to a free name.
    #[error("file name too long: {}", path.display())]
    NameTooLong {
        /// The path whose basename could not be placed on disk.
        path: PathBuf,
    },

    /// Aggregated per-job failure carrying every underlying cause.
    #[error(transparent)]
    Job(Box<JobFailure>),
}

impl ExtractError {
    /// Returns `true` for the credential failure the password retry loop
    /// keys on.
    #[must_use]
    pub fn is_wrong_password(&self) -> bool {
        match self {
            Self::WrongPassword => true,
            Self::Job(failure) => failure
                .causes
                .last()
                .is_some_and(ExtractError::is_wrong_password),
            _ => false,
        }
    }

    /// Returns `true` if this error means the queue rejected an operation
    /// because of its lifecycle state, leaving the queue itself unaffected.
    #[must_use]
    pub const fn is_queue_misuse(&self) -> bool {
        matches!(self, Self::QueueStopped | Self::QueueRunning)
    }
}

/// Aggregated failure for one archive or one job.
///
/// Collects every underlying error (for example one per password attempt)
/// plus non-fatal warnings, alongside the archive path, output directory,
/// partial byte count, and the detected archive type.
#[derive(Debug, Default)]
pub struct JobFailure {
    /// Archive (or search root) the failure belongs to.
    pub archive: PathBuf,
    /// Output directory in use when the failure occurred.
    pub output: PathBuf,
    /// Bytes already written before the failure.
    pub bytes_written: u64,
    /// Detected archive type, when identification succeeded.
    pub archive_type: Option<ArchiveType>,
    /// Underlying errors in the order they occurred.
    pub causes: Vec<ExtractError>,
    /// Non-fatal warnings gathered along the way.
    pub warnings: Vec<String>,
}

impl JobFailure {
    /// Creates an empty failure context for the given archive and output.
    #[must_use]
    pub fn new(archive: PathBuf, output: PathBuf) -> Self {
        Self {
            archive,
            output,
            ..Self::default()
        }
    }

    /// Records one more underlying cause.
    pub fn push_cause(&mut self, cause: ExtractError) {
        self.causes.push(cause);
    }

    /// Boxes this context into an [`ExtractError`].
    #[must_use]
    pub fn into_error(self) -> ExtractError {
        ExtractError::Job(Box::new(self))
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "extraction of {} to {} failed",
            self.archive.display(),
            self.output.display()
        )?;
        if let Some(kind) = self.archive_type {
            write!(f, " (type: {kind})")?;
        }
        if self.bytes_written > 0 {
            write!(f, " after {} bytes", self.bytes_written)?;
        }
        match self.causes.len() {
            0 => Ok(()),
            1 => write!(f, ": {}", self.causes[0]),
            n => {
                write!(f, ": {n} errors")?;
                for cause in &self.causes {
                    write!(f, "; {cause}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for JobFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .last()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => Self::Io(io),
            zip::result::ZipError::InvalidPassword => Self::WrongPassword,
            // An encrypted entry read without a password surfaces as
            // "unsupported"; that is a credential problem for the retry
            // loop, not a format problem.
            zip::result::ZipError::UnsupportedArchive(msg)
                if msg.to_lowercase().contains("password") =>
            {
                Self::WrongPassword
            }
            other => Self::InvalidHead(other.to_string()),
        }
    }
}

impl From<sevenz_rust2::Error> for ExtractError {
    fn from(err: sevenz_rust2::Error) -> Self {
        // The decoder does not expose a dedicated credential error; it
        // reports bad passwords through the message text.
        let text = err.to_string();
        let lowered = text.to_lowercase();
        if lowered.contains("password") || lowered.contains("encrypt") {
            Self::WrongPassword
        } else {
            Self::InvalidHead(text)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractError::QueueStopped;
        assert_eq!(err.to_string(), "queue is not running");
    }

    #[test]
    fn test_invalid_path_display() {
        let err = ExtractError::InvalidPath {
            path: PathBuf::from("../etc/passwd"),
        };
        assert!(err.to_string().contains("../etc/passwd"));
    }

    #[test]
    fn test_password_exhausted_keeps_cause() {
        use std::error::Error;

        let err = ExtractError::PasswordExhausted {
            tried: 3,
            total: 3,
            cause: Box::new(ExtractError::WrongPassword),
        };
        assert_eq!(err.to_string(), "used password 3 of 3, extraction failed");
        assert!(
            err.source()
                .unwrap()
                .downcast_ref::<ExtractError>()
                .unwrap()
                .is_wrong_password()
        );
    }

    #[test]
    fn test_job_failure_source_is_last_cause() {
        use std::error::Error;

        let mut failure = JobFailure::new(PathBuf::from("a.zip"), PathBuf::from("/out"));
        failure.push_cause(ExtractError::InvalidHead("bad".into()));
        failure.push_cause(ExtractError::WrongPassword);
        let err = failure.into_error();

        assert!(err.is_wrong_password());
        // `Job` is transparent, so `source()` resolves straight to the
        // aggregate's last cause.
        let root = err.source().unwrap();
        assert!(
            root.downcast_ref::<ExtractError>()
                .unwrap()
                .is_wrong_password()
        );
    }

    #[test]
    fn test_job_failure_display_aggregates() {
        let mut failure = JobFailure::new(PathBuf::from("a.zip"), PathBuf::from("/out"));
        failure.bytes_written = 42;
        failure.push_cause(ExtractError::WrongPassword);
        failure.push_cause(ExtractError::InvalidHead("truncated".into()));
        let text = failure.to_string();
        assert!(text.contains("a.zip"));
        assert!(text.contains("after 42 bytes"));
        assert!(text.contains("2 errors"));
    }

    #[test]
    fn test_queue_misuse_predicate() {
        assert!(ExtractError::QueueStopped.is_queue_misuse());
        assert!(ExtractError::QueueRunning.is_queue_misuse());
        assert!(
            !ExtractError::NoCompressedFiles {
                root: PathBuf::new()
            }
            .is_queue_misuse()
        );
    }
}
