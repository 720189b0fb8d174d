//! ZIP collaborator with optional intra-archive file workers.
//!
//! Directories are created synchronously before any file work starts, so
//! concurrent file writers never race their parents into existence.
//! Parallel extraction shards entry indices round-robin over scoped
//! threads; each shard opens its own reader because a central archive
//! handle would serialize everything on one seek position anyway.

use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::PathBuf;
use std::sync::Arc;

use zip::ZipArchive;

use crate::Extraction;
use crate::ExtractError;
use crate::ExtractionRequest;
use crate::Result;
use crate::progress::ProgressTracker;
use crate::security;

/// Extracts a zip archive with `request.file_workers`-way parallelism
/// over independent entries.
///
/// Sequential and parallel runs produce identical byte and file counts;
/// the returned file list is ordered by entry index either way.
pub fn extract(request: &ExtractionRequest, tracker: &Arc<ProgressTracker>) -> Result<Extraction> {
    let file = std::fs::File::open(&request.source)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    // Pass 1: directories, and the index list of real file entries.
    let mut file_indices = Vec::new();
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        let name = PathBuf::from(entry.name());
        if entry.is_dir() {
            let dest = security::clean(&request.output_dir, &name)?;
            super::ensure_dir(&dest, request.dir_mode())?;
        } else {
            file_indices.push(index);
        }
    }
    drop(archive);

    let workers = request.file_workers.clamp(1, file_indices.len().max(1));
    let mut written = if workers <= 1 {
        extract_shard(request, &file_indices, tracker)?
    } else {
        extract_parallel(request, &file_indices, workers, tracker)?
    };

    // Entry-index order is the archive's write order.
    written.sort_unstable_by_key(|item| item.index);

    let mut extraction = Extraction {
        archives: vec![request.source.clone()],
        ..Extraction::default()
    };
    for item in written {
        extraction.size += item.bytes;
        extraction.files.push(item.path);
    }
    Ok(extraction)
}

struct WrittenEntry {
    index: usize,
    bytes: u64,
    path: PathBuf,
}

fn extract_parallel(
    request: &ExtractionRequest,
    file_indices: &[usize],
    workers: usize,
    tracker: &Arc<ProgressTracker>,
) -> Result<Vec<WrittenEntry>> {
    let mut shards: Vec<Vec<usize>> = vec![Vec::new(); workers];
    for (slot, &index) in file_indices.iter().enumerate() {
        shards[slot % workers].push(index);
    }

    let outcomes: Vec<std::thread::Result<Result<Vec<WrittenEntry>>>> =
        std::thread::scope(|scope| {
            let handles: Vec<_> = shards
                .iter()
                .map(|shard| scope.spawn(|| extract_shard(request, shard, tracker)))
                .collect();
            handles.into_iter().map(std::thread::ScopedJoinHandle::join).collect()
        });

    let mut written = Vec::with_capacity(file_indices.len());
    for outcome in outcomes {
        let shard = outcome
            .map_err(|_| ExtractError::Io(std::io::Error::other("zip file worker panicked")))??;
        written.extend(shard);
    }
    Ok(written)
}

/// Extracts one slice of entry indices through an independent reader.
fn extract_shard(
    request: &ExtractionRequest,
    indices: &[usize],
    tracker: &Arc<ProgressTracker>,
) -> Result<Vec<WrittenEntry>> {
    let file = std::fs::File::open(&request.source)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let mut written = Vec::with_capacity(indices.len());

    for &index in indices {
        let mut entry = open_entry(&mut archive, index, request.password.as_deref())?;
        let name = PathBuf::from(entry.name());
        let compressed = entry.compressed_size();
        let dest = security::clean(&request.output_dir, &name)?;
        let (bytes, used) = super::write_entry(
            &mut entry,
            &dest,
            request.file_mode(),
            request.dir_mode(),
            tracker,
        )?;
        tracker.add_read(compressed);
        written.push(WrittenEntry {
            index,
            bytes,
            path: used,
        });
    }
    Ok(written)
}

fn open_entry<'a, R: Read + Seek>(
    archive: &'a mut ZipArchive<R>,
    index: usize,
    password: Option<&str>,
) -> Result<zip::read::ZipFile<'a, R>> {
    match password {
        Some(password) => archive
            .by_index_decrypt(index, password.as_bytes())
            .map_err(Into::into),
        None => archive.by_index(index).map_err(Into::into),
    }
}
