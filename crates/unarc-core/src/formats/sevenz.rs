//! 7z collaborator.
//!
//! Built on the decoder's entry-callback API. Entry paths are
//! pre-validated against the sanitizer before any byte is written, and
//! re-checked inside the callback; the callback smuggles typed errors out
//! through a cell because the decoder's error type would otherwise
//! flatten them to text.

use std::cell::RefCell;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use sevenz_rust2::Archive;
use sevenz_rust2::Password;

use crate::Extraction;
use crate::ExtractError;
use crate::ExtractionRequest;
use crate::Result;
use crate::progress::ProgressTracker;
use crate::security;

/// Extracts a 7z archive, trying the request's password when the archive
/// is encrypted.
///
/// Wrong or missing passwords surface as
/// [`ExtractError::WrongPassword`] so the retry loop can continue.
pub fn extract(request: &ExtractionRequest, tracker: &Arc<ProgressTracker>) -> Result<Extraction> {
    let mut file = std::fs::File::open(&request.source)?;
    let password = password_of(request);

    // Header read doubles as the credential check: an encrypted header
    // with the wrong password fails here.
    let archive = Archive::read(&mut file, &password)?;

    // Pre-validate every entry path before writing anything, so a
    // traversal attempt fails the archive with zero partial output.
    for entry in &archive.files {
        security::clean(&request.output_dir, Path::new(&entry.name))?;
    }
    file.rewind()?;

    let extraction = RefCell::new(Extraction {
        archives: vec![request.source.clone()],
        ..Extraction::default()
    });
    let failure: RefCell<Option<ExtractError>> = RefCell::new(None);

    let extract_fn = |entry: &sevenz_rust2::ArchiveEntry,
                      reader: &mut dyn Read,
                      _dest: &PathBuf|
     -> std::result::Result<bool, sevenz_rust2::Error> {
        let outcome = write_one(request, tracker, &extraction, entry, reader);
        match outcome {
            Ok(()) => Ok(true),
            Err(err) => {
                *failure.borrow_mut() = Some(err);
                Err(sevenz_rust2::Error::Other("entry extraction failed".into()))
            }
        }
    };

    let decoded = sevenz_rust2::decompress_with_extract_fn_and_password(
        &mut file,
        &request.output_dir,
        password_of(request),
        extract_fn,
    );

    if let Some(err) = failure.into_inner() {
        return Err(err);
    }
    decoded?;
    Ok(extraction.into_inner())
}

fn write_one(
    request: &ExtractionRequest,
    tracker: &Arc<ProgressTracker>,
    extraction: &RefCell<Extraction>,
    entry: &sevenz_rust2::ArchiveEntry,
    reader: &mut dyn Read,
) -> Result<()> {
    let dest = security::clean(&request.output_dir, Path::new(&entry.name))?;
    if entry.is_directory() {
        super::ensure_dir(&dest, request.dir_mode())?;
    } else {
        // Per-entry compressed size is not exposed by the decoder, so the
        // read counter stays at zero for 7z.
        let (bytes, used) = super::write_entry(
            reader,
            &dest,
            request.file_mode(),
            request.dir_mode(),
            tracker,
        )?;
        let mut extraction = extraction.borrow_mut();
        extraction.size += bytes;
        extraction.files.push(used);
    }
    Ok(())
}

fn password_of(request: &ExtractionRequest) -> Password {
    request
        .password
        .as_deref()
        .map_or_else(Password::empty, Password::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let request = ExtractionRequest {
            source: PathBuf::from("/nonexistent/archive.7z"),
            output_dir: std::env::temp_dir(),
            ..ExtractionRequest::default()
        };
        let tracker = Arc::new(ProgressTracker::new(
            Arc::new(PathBuf::from("test")),
            None,
            0,
            0,
            0,
            false,
        ));
        assert!(matches!(
            extract(&request, &tracker),
            Err(ExtractError::Io(_))
        ));
    }

    #[test]
    fn test_garbage_header_is_invalid_head() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("fake.7z");
        std::fs::write(&source, b"definitely not a 7z archive").unwrap();

        let request = ExtractionRequest {
            source,
            output_dir: temp.path().to_path_buf(),
            ..ExtractionRequest::default()
        };
        let tracker = Arc::new(ProgressTracker::new(
            Arc::new(PathBuf::from("test")),
            None,
            0,
            0,
            0,
            false,
        ));
        let result = extract(&request, &tracker);
        assert!(matches!(result, Err(ExtractError::InvalidHead(_))));
    }

    #[test]
    fn test_password_of_defaults_to_empty() {
        let request = ExtractionRequest::default();
        // Just exercises the conversion; an empty password is the
        // decoder's "no password" marker.
        let _ = password_of(&request);
        let request = ExtractionRequest {
            password: Some("hunter2".into()),
            ..ExtractionRequest::default()
        };
        let _ = password_of(&request);
    }
}
