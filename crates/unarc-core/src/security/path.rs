//! Output-root confinement for decoded archive entry names.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::ExtractError;
use crate::Result;

/// Joins a decoded entry name onto the output root and verifies the
/// result stays inside that root.
///
/// Every collaborator must route every entry it is about to write through
/// this function before creating any file or directory. Validation:
///
/// 1. Null bytes are rejected
/// 2. Absolute names and prefix components are rejected
/// 3. `..` segments are rejected outright (no counting games)
/// 4. `.` segments are normalized away
/// 5. The joined path's deepest existing ancestor is canonicalized and
///    must still live under the root, which defeats symlinked-parent
///    escapes
///
/// A failure here fails the whole extraction for that archive; partial
/// files already written are retained and reported as partial progress.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidPath`] for any entry name that escapes
/// the root.
///
/// # Examples
///
/// ```
/// use unarc_core::security::clean;
/// use std::path::Path;
///
/// let root = std::env::temp_dir();
/// assert!(clean(&root, Path::new("sub/file.txt")).is_ok());
/// assert!(clean(&root, Path::new("../escape.txt")).is_err());
/// assert!(clean(&root, Path::new("/etc/passwd")).is_err());
/// ```
pub fn clean(output_root: &Path, entry_name: &Path) -> Result<PathBuf> {
    if has_null_bytes(entry_name) {
        return Err(invalid(entry_name));
    }

    let mut normalized = PathBuf::new();
    for component in entry_name.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid(entry_name));
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(invalid(entry_name));
    }

    // Resolve the root itself so prefix comparison is against a stable
    // canonical form; the root may legitimately not exist yet.
    let root = output_root
        .canonicalize()
        .unwrap_or_else(|_| output_root.to_path_buf());
    let resolved = root.join(&normalized);

    // Canonicalize the deepest existing ancestor. A symlink planted by an
    // earlier entry would otherwise carry later writes outside the root.
    let mut probe = resolved.as_path();
    while let Some(parent) = probe.parent() {
        match parent.canonicalize() {
            Ok(canonical) => {
                if !canonical.starts_with(&root) {
                    return Err(invalid(entry_name));
                }
                break;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => probe = parent,
            Err(e) => return Err(ExtractError::Io(e)),
        }
    }

    if !resolved.starts_with(&root) {
        return Err(invalid(entry_name));
    }
    Ok(resolved)
}

fn invalid(entry_name: &Path) -> ExtractError {
    ExtractError::InvalidPath {
        path: entry_name.to_path_buf(),
    }
}

#[cfg(unix)]
fn has_null_bytes(path: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().contains(&b'\0')
}

#[cfg(not(unix))]
fn has_null_bytes(path: &Path) -> bool {
    path.to_str().is_none_or(|s| s.contains('\0'))
}
