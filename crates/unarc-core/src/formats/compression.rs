//! Single-stream compression collaborators (gz, bz2, xz, zst).
//!
//! These formats carry exactly one payload; extraction produces a single
//! output file named by stripping the compression suffix.

use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::Extraction;
use crate::ExtractError;
use crate::ExtractionRequest;
use crate::Result;
use crate::progress::CountingReader;
use crate::progress::ProgressTracker;
use crate::security;

/// Compression codec, used both standalone and as a tar layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Gzip (deflate).
    Gzip,
    /// Bzip2 (Burrows-Wheeler).
    Bzip2,
    /// Xz (LZMA2).
    Xz,
    /// Zstandard.
    Zstd,
}

impl Codec {
    /// Wraps `inner` in the decoding reader for this codec.
    pub(crate) fn reader<'a, R: Read + 'a>(self, inner: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(inner)),
            Self::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(inner)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(inner)),
            Self::Zstd => Box::new(
                zstd::stream::read::Decoder::new(inner)
                    .map_err(|e| ExtractError::InvalidHead(e.to_string()))?,
            ),
        })
    }
}

/// Decompresses a single-stream file into the request's output directory.
///
/// The payload name is the source basename with its compression suffix
/// removed, routed through the path sanitizer like any archive entry.
pub fn extract(
    request: &ExtractionRequest,
    tracker: &Arc<ProgressTracker>,
    codec: Codec,
) -> Result<Extraction> {
    let payload_name = payload_name(&request.source)?;
    let dest = security::clean(&request.output_dir, Path::new(&payload_name))?;

    let file = std::fs::File::open(&request.source)?;
    let counted = CountingReader::new(BufReader::new(file), Arc::clone(tracker));
    let mut decoder = codec.reader(counted)?;

    let (size, used) = super::write_entry(
        &mut decoder,
        &dest,
        request.file_mode(),
        request.dir_mode(),
        tracker,
    )?;

    Ok(Extraction {
        size,
        files: vec![used],
        archives: vec![request.source.clone()],
        ..Extraction::default()
    })
}

/// Basename of the decompressed payload: the source name minus its final
/// suffix (`notes.txt.gz` → `notes.txt`).
fn payload_name(source: &Path) -> Result<String> {
    source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ExtractError::InvalidPath {
            path: source.to_path_buf(),
        })
}
