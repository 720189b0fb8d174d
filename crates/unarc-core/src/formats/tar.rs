//! Tar collaborator, with optional compression layers.

use std::io::BufReader;
use std::io::Read;
use std::sync::Arc;

use crate::Extraction;
use crate::ExtractionRequest;
use crate::Result;
use crate::progress::CountingReader;
use crate::progress::ProgressTracker;
use crate::security;

use super::compression::Codec;

/// Extracts a tar archive, decoding through `codec` when the stream is
/// compressed.
///
/// Entries are unpacked manually rather than through `tar`'s own unpack
/// so every path goes through the sanitizer and every byte through the
/// counting writer. Entry kinds other than files and directories
/// (symlinks, hard links, devices, fifos) are skipped; this layer only
/// materializes content the path-safety invariant can vouch for. Each
/// skip is recorded as a warning on the returned extraction.
pub fn extract(
    request: &ExtractionRequest,
    tracker: &Arc<ProgressTracker>,
    codec: Option<Codec>,
) -> Result<Extraction> {
    let file = std::fs::File::open(&request.source)?;
    let counted = CountingReader::new(BufReader::new(file), Arc::clone(tracker));
    let reader: Box<dyn Read> = match codec {
        Some(codec) => codec.reader(counted)?,
        None => Box::new(counted),
    };

    let mut archive = tar::Archive::new(reader);
    let mut extraction = Extraction {
        archives: vec![request.source.clone()],
        ..Extraction::default()
    };

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.into_owned();
        let kind = entry.header().entry_type();

        if kind.is_dir() {
            let dest = security::clean(&request.output_dir, &name)?;
            super::ensure_dir(&dest, request.dir_mode())?;
        } else if kind.is_file() {
            let dest = security::clean(&request.output_dir, &name)?;
            let (bytes, used) = super::write_entry(
                &mut entry,
                &dest,
                request.file_mode(),
                request.dir_mode(),
                tracker,
            )?;
            extraction.size += bytes;
            extraction.files.push(used);
        } else {
            extraction
                .warnings
                .push(format!("skipped {kind:?} entry {}", name.display()));
        }
    }

    Ok(extraction)
}
