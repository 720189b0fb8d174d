//! Filesystem-safe basename truncation.
//!
//! Most filesystems cap a basename at 255 bytes. Archives built on
//! systems without that limit (or with multi-byte names measured in
//! characters) can carry entries that cannot be created as-is; those are
//! shortened here instead of failing the whole job.

use std::path::Path;
use std::path::PathBuf;

use crate::ExtractError;
use crate::Result;

/// Maximum basename length in bytes accepted by the target filesystem.
pub const NAME_MAX_BYTES: usize = 255;

/// Upper bound on `~N` disambiguator attempts for a colliding stem.
const MAX_SUFFIX_ATTEMPTS: usize = 99;

// Room reserved in the truncated stem so a "~NN" disambiguator never
// pushes the name back over the limit.
const SUFFIX_RESERVE: usize = 3;

/// Shortens an over-long basename to a filesystem-safe length.
///
/// The basename is truncated to the shortest prefix that fits in
/// [`NAME_MAX_BYTES`], never splitting inside a multi-byte character and
/// preserving the original extension. If the truncated name already
/// exists on disk, a numeric disambiguator (`~1`, `~2`, …) is appended to
/// the *same* truncated stem, trying up to a bounded number of candidates.
///
/// Paths whose basename already fits are returned unchanged, even if a
/// file exists there: collision handling on a name the archive itself
/// chose is the overwrite policy's business, not this function's.
///
/// # Errors
///
/// Returns [`ExtractError::NameTooLong`] when the extension alone leaves
/// no room for a stem, or when every disambiguated candidate is taken.
pub fn truncate_for_filesystem(path: &Path) -> Result<PathBuf> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        // Non-UTF-8 names never reach here in practice; entry names come
        // out of the decoders as strings.
        return Err(too_long(path));
    };
    if name.len() <= NAME_MAX_BYTES {
        return Ok(path.to_path_buf());
    }

    let (stem, extension) = split_extension(name);
    let budget = NAME_MAX_BYTES
        .checked_sub(extension.len() + SUFFIX_RESERVE)
        .ok_or_else(|| too_long(path))?;
    if budget == 0 {
        return Err(too_long(path));
    }

    let truncated_stem = truncate_on_char_boundary(stem, budget);
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let candidate = parent.join(format!("{truncated_stem}{extension}"));
    if !candidate.exists() {
        return Ok(candidate);
    }

    // Disambiguate against the unmutated truncated stem; re-truncating
    // per attempt would make `~1` and `~2` disagree about the base name.
    for attempt in 1..=MAX_SUFFIX_ATTEMPTS {
        let candidate = parent.join(format!("{truncated_stem}~{attempt}{extension}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(too_long(path))
}

/// Returns `true` if an I/O error signals an over-long file name.
///
/// Checks the platform error number first and falls back to message text
/// for wrapped errors that lost it.
#[must_use]
pub fn is_name_too_long(err: &std::io::Error) -> bool {
    #[cfg(unix)]
    if err.raw_os_error() == Some(libc::ENAMETOOLONG) {
        return true;
    }
    err.to_string().to_lowercase().contains("too long")
}

/// Creates an output file, shortening the basename when the filesystem
/// rejects it as too long.
///
/// Returns the open file together with the path actually used, which may
/// differ from the requested one.
pub fn create_shortened(path: &Path) -> Result<(std::fs::File, PathBuf)> {
    match std::fs::File::create(path) {
        Ok(file) => Ok((file, path.to_path_buf())),
        Err(err) if is_name_too_long(&err) => {
            let shortened = truncate_for_filesystem(path)?;
            let file = std::fs::File::create(&shortened)?;
            Ok((file, shortened))
        }
        Err(err) => Err(ExtractError::Io(err)),
    }
}

fn too_long(path: &Path) -> ExtractError {
    ExtractError::NameTooLong {
        path: path.to_path_buf(),
    }
}

/// Splits `name` into (stem, extension-with-dot). Dotfiles and names
/// without a dot have an empty extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Longest prefix of `s` at most `max_bytes` long that ends on a UTF-8
/// character boundary.
fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
