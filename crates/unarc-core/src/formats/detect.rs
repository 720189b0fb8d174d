//! Archive format detection by suffix and by binary signature.

use std::io::Read;
use std::path::Path;

use crate::ExtractError;
use crate::Result;

/// Supported archive and compression kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveType {
    /// Tar archive (uncompressed).
    Tar,
    /// Gzip-compressed tar archive.
    TarGz,
    /// Bzip2-compressed tar archive.
    TarBz2,
    /// XZ-compressed tar archive.
    TarXz,
    /// Zstd-compressed tar archive.
    TarZst,
    /// ZIP archive.
    Zip,
    /// 7z archive.
    SevenZ,
    /// Single-stream gzip file.
    Gz,
    /// Single-stream bzip2 file.
    Bz2,
    /// Single-stream xz file.
    Xz,
    /// Single-stream zstd file.
    Zst,
    /// ISO9660 optical media image.
    ///
    /// Detected so the recursion policy can key on it; no decoder is
    /// registered. Jobs skip the image with a warning, direct extraction
    /// reports the unknown-type condition.
    Iso,
}

impl std::fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
            Self::TarZst => "tar.zst",
            Self::Zip => "zip",
            Self::SevenZ => "7z",
            Self::Gz => "gz",
            Self::Bz2 => "bz2",
            Self::Xz => "xz",
            Self::Zst => "zst",
            Self::Iso => "iso",
        };
        f.write_str(name)
    }
}

/// Static ordered suffix table.
///
/// Compound suffixes come before their single-part aliases so the more
/// specific match wins (`.tar.gz` before `.gz`).
const SUFFIXES: &[(&str, ArchiveType)] = &[
    (".tar.gz", ArchiveType::TarGz),
    (".tar.bz2", ArchiveType::TarBz2),
    (".tar.xz", ArchiveType::TarXz),
    (".tar.zst", ArchiveType::TarZst),
    (".tgz", ArchiveType::TarGz),
    (".tbz2", ArchiveType::TarBz2),
    (".tbz", ArchiveType::TarBz2),
    (".txz", ArchiveType::TarXz),
    (".tzst", ArchiveType::TarZst),
    (".tar", ArchiveType::Tar),
    (".zip", ArchiveType::Zip),
    (".7z", ArchiveType::SevenZ),
    (".iso", ArchiveType::Iso),
    (".gz", ArchiveType::Gz),
    (".bz2", ArchiveType::Bz2),
    (".xz", ArchiveType::Xz),
    (".zst", ArchiveType::Zst),
];

struct Signature {
    offset: usize,
    magic: &'static [u8],
    kind: ArchiveType,
}

/// Signature table, ordered so that when magics overlap the longer, more
/// specific sequence is tested before a shorter true prefix of it.
const SIGNATURES: &[Signature] = &[
    Signature {
        offset: 0,
        magic: &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C],
        kind: ArchiveType::SevenZ,
    },
    Signature {
        offset: 0,
        magic: &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00],
        kind: ArchiveType::Xz,
    },
    Signature {
        offset: 0,
        magic: b"PK\x03\x04",
        kind: ArchiveType::Zip,
    },
    Signature {
        offset: 0,
        magic: &[0x28, 0xB5, 0x2F, 0xFD],
        kind: ArchiveType::Zst,
    },
    Signature {
        offset: 0,
        magic: b"BZh",
        kind: ArchiveType::Bz2,
    },
    Signature {
        offset: 0,
        magic: &[0x1F, 0x8B],
        kind: ArchiveType::Gz,
    },
    Signature {
        offset: 257,
        magic: b"ustar",
        kind: ArchiveType::Tar,
    },
    Signature {
        offset: 32769,
        magic: b"CD001",
        kind: ArchiveType::Iso,
    },
];

/// Bytes needed to cover the deepest known signature offset.
const SNIFF_LEN: usize = 32769 + 5;

/// Resolves an archive type from the file name suffix alone.
///
/// # Examples
///
/// ```
/// use unarc_core::formats::detect::{by_extension, ArchiveType};
/// use std::path::Path;
///
/// assert_eq!(by_extension(Path::new("a.tar.gz")), Some(ArchiveType::TarGz));
/// assert_eq!(by_extension(Path::new("a.gz")), Some(ArchiveType::Gz));
/// assert_eq!(by_extension(Path::new("a.rar")), None);
/// ```
#[must_use]
pub fn by_extension(path: &Path) -> Option<ArchiveType> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    SUFFIXES
        .iter()
        .find(|(suffix, _)| name.len() > suffix.len() && name.ends_with(suffix))
        .map(|&(_, kind)| kind)
}

/// Resolves an archive type by sniffing a bounded prefix of the file.
///
/// The prefix is read once; the first matching signature wins. A file
/// shorter than a signature's offset simply cannot match it.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read. An unrecognized
/// prefix is `Ok(None)`, not an error.
pub fn by_signature(path: &Path) -> Result<Option<ArchiveType>> {
    let file = std::fs::File::open(path)?;
    let mut head = Vec::with_capacity(8 * 1024);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(match_signature(&head))
}

fn match_signature(head: &[u8]) -> Option<ArchiveType> {
    SIGNATURES
        .iter()
        .find(|sig| {
            head.len() >= sig.offset + sig.magic.len()
                && &head[sig.offset..sig.offset + sig.magic.len()] == sig.magic
        })
        .map(|sig| sig.kind)
}

/// Full resolution: suffix lookup first, signature sniff as fallback.
///
/// # Errors
///
/// Returns [`ExtractError::UnknownArchiveType`] when neither mode
/// recognizes the file, and I/O errors from the sniff read.
pub fn detect(path: &Path) -> Result<ArchiveType> {
    if let Some(kind) = by_extension(path) {
        return Ok(kind);
    }
    by_signature(path)?.ok_or_else(|| ExtractError::UnknownArchiveType {
        path: path.to_path_buf(),
    })
}
