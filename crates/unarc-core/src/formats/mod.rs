//! Format collaborators and dispatch.
//!
//! Each submodule decodes one archive/compression kind behind the shared
//! extraction contract: one [`crate::ExtractionRequest`] in, one
//! [`crate::Extraction`] out. Formats without native multi-volume support
//! report the single input file as their consumed list.

pub mod compression;
pub mod detect;
pub mod sevenz;
pub mod tar;
pub mod zip;

use std::io::BufWriter;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Extraction;
use crate::ExtractError;
use crate::ExtractionRequest;
use crate::Result;
use crate::progress::CountingWriter;
use crate::progress::ProgressTracker;
use crate::security::filename::create_shortened;

pub use detect::ArchiveType;

/// Dispatches an extraction attempt to the collaborator for `kind`.
///
/// # Errors
///
/// [`ExtractError::UnknownArchiveType`] for kinds that are detected but
/// have no registered decoder (ISO), plus whatever the collaborator
/// reports.
pub fn extract_with(
    kind: ArchiveType,
    request: &ExtractionRequest,
    tracker: &Arc<ProgressTracker>,
) -> Result<Extraction> {
    use compression::Codec;

    match kind {
        ArchiveType::Tar => tar::extract(request, tracker, None),
        ArchiveType::TarGz => tar::extract(request, tracker, Some(Codec::Gzip)),
        ArchiveType::TarBz2 => tar::extract(request, tracker, Some(Codec::Bzip2)),
        ArchiveType::TarXz => tar::extract(request, tracker, Some(Codec::Xz)),
        ArchiveType::TarZst => tar::extract(request, tracker, Some(Codec::Zstd)),
        ArchiveType::Zip => zip::extract(request, tracker),
        ArchiveType::SevenZ => sevenz::extract(request, tracker),
        ArchiveType::Gz => compression::extract(request, tracker, Codec::Gzip),
        ArchiveType::Bz2 => compression::extract(request, tracker, Codec::Bzip2),
        ArchiveType::Xz => compression::extract(request, tracker, Codec::Xz),
        ArchiveType::Zst => compression::extract(request, tracker, Codec::Zstd),
        ArchiveType::Iso => Err(ExtractError::UnknownArchiveType {
            path: request.source.clone(),
        }),
    }
}

/// Creates a directory (and missing ancestors) with the requested mode on
/// the leaf.
pub(crate) fn ensure_dir(path: &Path, mode: u32) -> Result<()> {
    std::fs::create_dir_all(path)?;
    set_mode(path, mode)
}

/// Writes one entry's bytes to `dest`, counting them through the tracker.
///
/// Handles parent creation, over-long basenames (shortened via the
/// sanitizer), buffered output, and unix permissions. Returns the byte
/// count and the path actually written, which may differ from `dest` when
/// the basename had to be shortened.
pub(crate) fn write_entry<R: Read + ?Sized>(
    reader: &mut R,
    dest: &Path,
    mode: u32,
    dir_mode: u32,
    tracker: &Arc<ProgressTracker>,
) -> Result<(u64, PathBuf)> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent, dir_mode)?;
    }

    let (file, used) = create_shortened(dest)?;
    let mut writer = CountingWriter::new(BufWriter::with_capacity(64 * 1024, file), tracker.clone());
    std::io::copy(reader, &mut writer)?;
    let bytes = writer.total_bytes();
    std::io::Write::flush(&mut writer)?;

    set_mode(&used, mode)?;
    tracker.file_done();
    Ok((bytes, used))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet_tracker() -> Arc<ProgressTracker> {
        Arc::new(ProgressTracker::new(
            Arc::new(PathBuf::from("test")),
            None,
            0,
            0,
            0,
            false,
        ))
    }

    #[test]
    fn test_write_entry_creates_parents() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a/b/file.txt");
        let tracker = quiet_tracker();

        let (bytes, used) = write_entry(&mut &b"payload"[..], &dest, 0o644, 0o755, &tracker).unwrap();
        assert_eq!(bytes, 7);
        assert_eq!(used, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    #[cfg(unix)]
    fn test_write_entry_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("locked.bin");
        let tracker = quiet_tracker();

        write_entry(&mut &b"x"[..], &dest, 0o600, 0o755, &tracker).unwrap();
        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_write_entry_accepts_trait_object_reader() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("streamed.bin");
        let tracker = quiet_tracker();

        // Callback-driven decoders hand entries over as `&mut dyn Read`.
        let mut src: &[u8] = b"streamed";
        let reader: &mut dyn Read = &mut src;
        let (bytes, used) = write_entry(reader, &dest, 0o644, 0o755, &tracker).unwrap();
        assert_eq!(bytes, 8);
        assert_eq!(std::fs::read(used).unwrap(), b"streamed");
    }

    #[test]
    fn test_extract_with_iso_reports_unknown_type() {
        let request = ExtractionRequest {
            source: PathBuf::from("disc.iso"),
            ..ExtractionRequest::default()
        };
        let result = extract_with(ArchiveType::Iso, &request, &quiet_tracker());
        assert!(matches!(
            result,
            Err(ExtractError::UnknownArchiveType { .. })
        ));
    }
}
