//! One-shot extraction entry point.
//!
//! This is the path callers use when they have a single archive and no
//! need for the job queue: detect the format, wire up a progress
//! tracker, and run the password retry loop around the collaborator.

use std::path::Path;
use std::sync::Arc;

use crate::Extraction;
use crate::ExtractError;
use crate::ExtractionRequest;
use crate::Result;
use crate::formats;
use crate::formats::ArchiveType;
use crate::formats::detect;
use crate::progress::ProgressTracker;

/// Detects the archive type of `request.source` and extracts it into
/// `request.output_dir`.
///
/// # Errors
///
/// [`ExtractError::UnknownArchiveType`] when neither suffix nor
/// signature resolves the format, plus everything [`extract_as`] can
/// return.
pub fn extract_file(request: &ExtractionRequest) -> Result<Extraction> {
    let kind = detect::detect(&request.source)?;
    extract_as(kind, request)
}

/// Extracts `request.source` as `kind`, retrying encrypted archives with
/// each configured password in order.
///
/// The final progress snapshot with the completion flag is delivered
/// exactly once, whether extraction succeeds or fails.
///
/// # Errors
///
/// [`ExtractError::PasswordExhausted`] when a password list was
/// configured and every entry was rejected; otherwise the first
/// non-credential failure.
pub fn extract_as(kind: ArchiveType, request: &ExtractionRequest) -> Result<Extraction> {
    let compressed = std::fs::metadata(&request.source).map(|m| m.len()).unwrap_or(0);
    let (total, entries) = match kind {
        ArchiveType::Zip => zip_totals(&request.source),
        _ => (0, 0),
    };
    let parallel = kind == ArchiveType::Zip && request.file_workers > 1;
    let tracker = Arc::new(ProgressTracker::new(
        request.source_handle(),
        request.progress.clone(),
        total,
        compressed,
        entries,
        parallel,
    ));

    let outcome = run_attempts(kind, request, &tracker);
    tracker.finish();
    outcome
}

/// Tries each password candidate in order, stopping at the first that
/// succeeds or the first non-credential failure.
fn run_attempts(
    kind: ArchiveType,
    request: &ExtractionRequest,
    tracker: &Arc<ProgressTracker>,
) -> Result<Extraction> {
    let (candidates, from_list) = password_candidates(request);
    let total = candidates.len();
    let mut last: Option<ExtractError> = None;

    for candidate in candidates {
        let derived = request.with_password(candidate.as_deref());
        match formats::extract_with(kind, &derived, tracker) {
            Ok(extraction) => return Ok(extraction),
            Err(err) if err.is_wrong_password() => last = Some(err),
            Err(err) => return Err(err),
        }
    }

    // Every candidate was rejected as a credential failure.
    let cause = last.unwrap_or(ExtractError::WrongPassword);
    if from_list {
        Err(ExtractError::PasswordExhausted {
            tried: total,
            total,
            cause: Box::new(cause),
        })
    } else {
        Err(cause)
    }
}

/// The ordered password attempts for one extraction call, and whether
/// they came from the retry list (as opposed to the single inline
/// password or no password at all).
fn password_candidates(request: &ExtractionRequest) -> (Vec<Option<String>>, bool) {
    if request.passwords.is_empty() {
        (vec![request.password.clone()], false)
    } else {
        (request.passwords.iter().cloned().map(Some).collect(), true)
    }
}

/// Best-effort uncompressed total and entry count for a zip, read from
/// the central directory. Unreadable archives report zero; the real
/// error surfaces from the extraction pass.
fn zip_totals(source: &Path) -> (u64, u64) {
    let Ok(file) = std::fs::File::open(source) else {
        return (0, 0);
    };
    let Ok(mut archive) = zip::ZipArchive::new(file) else {
        return (0, 0);
    };
    let mut total = 0;
    let entries = archive.len() as u64;
    for index in 0..archive.len() {
        if let Ok(entry) = archive.by_index_raw(index) {
            total += entry.size();
        }
    }
    (total, entries)
}
