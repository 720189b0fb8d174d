//! Per-job extraction state machine.
//!
//! One call to [`run`] takes a job through discover, extract, the
//! nested-archive recursion check, and cleanup, then delivers the finish
//! notification. This is the only layer that logs: everything below it
//! returns wrapped errors, and the summary line is emitted only when the
//! job carries no notifier at all.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::Extraction;
use crate::ExtractError;
use crate::ExtractionRequest;
use crate::Result;
use crate::api;
use crate::discover;
use crate::discover::ArchiveList;
use crate::discover::Filter;
use crate::error::JobFailure;
use crate::formats::ArchiveType;
use crate::formats::detect;
use crate::queue::job::Job;
use crate::queue::job::Response;

/// Suffix appended to the search root's name to form the temporary
/// output folder.
pub const TEMP_SUFFIX: &str = "_unarc";

/// Pause before relocating files out of the temp folder, letting slow
/// filesystems finish flushing the last writes.
const SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Bound on `.0`, `.1`, … collision suffixes when renaming a kept temp
/// folder.
const MAX_RENAME_ATTEMPTS: usize = 99;

/// Runs one job to completion and delivers its two notifications.
///
/// `queue_depth` is the number of jobs observed waiting behind this one
/// when a worker picked it up; it is reported in the start notification.
pub(crate) fn run(extract_job: Job, queue_depth: usize) {
    let started = Instant::now();
    let wall_start = SystemTime::now();
    let archives =
        discover::find_compressed_files(&extract_job.root, &extract_job.filter).unwrap_or_default();

    let mut work = Work::new(extract_job, archives);
    work.notify_start(queue_depth);

    let error = work.execute(wall_start, started).err();
    work.notify_finish(started.elapsed(), error);
}

/// Accumulated state for one running job.
struct Work {
    job: Job,
    output: PathBuf,
    created_output: bool,
    archives: ArchiveList,
    extras: ArchiveList,
    consumed: HashSet<PathBuf>,
    totals: Extraction,
    saw_iso: bool,
}

impl Work {
    fn new(extract_job: Job, archives: ArchiveList) -> Self {
        let output = extract_job
            .output
            .clone()
            .unwrap_or_else(|| temp_path(&extract_job.root));
        Self {
            job: extract_job,
            output,
            created_output: false,
            archives,
            extras: ArchiveList::new(),
            consumed: HashSet::new(),
            totals: Extraction::default(),
            saw_iso: false,
        }
    }

    fn notify_start(&self, queue_depth: usize) {
        if let Some(notifier) = &self.job.notifier {
            notifier.deliver(Response {
                done: false,
                root: self.job.root.clone(),
                output: self.output.clone(),
                queue_depth,
                archives: self.archives.clone(),
                ..Response::default()
            });
        }
    }

    fn execute(&mut self, wall_start: SystemTime, started: Instant) -> Result<()> {
        if self.archives.is_empty() {
            return Err(ExtractError::NoCompressedFiles {
                root: self.job.root.clone(),
            });
        }

        self.created_output = !self.output.exists();
        std::fs::create_dir_all(&self.output)?;

        if let Err(err) = self.extract_and_recurse() {
            self.scrub_output();
            return Err(err);
        }
        self.cleanup(wall_start, started)
    }

    /// Extract: every discovered archive, sequentially per directory
    /// group. RecurseCheck: re-scan the output area for archives revealed
    /// by the extraction itself, until a scan turns up nothing new.
    fn extract_and_recurse(&mut self) -> Result<()> {
        let groups = self.archives.clone();
        self.extract_groups(&groups, false)?;

        if self.job.no_recurse {
            return Ok(());
        }
        // The job's suffix exclusions keep applying to nested archives;
        // the depth bounds reset because they were scoped to the root.
        let refilter = Filter {
            exclude_suffixes: self.job.filter.exclude_suffixes.clone(),
            ..Filter::default()
        };
        loop {
            // Disc images routinely carry many same-named small archives
            // that are not meant to be unpacked further.
            if self.saw_iso && !self.job.allow_iso_recursion {
                break;
            }
            let found = discover::find_compressed_files(&self.output, &refilter)?;
            let mut fresh = ArchiveList::new();
            for (dir, list) in found {
                let new: Vec<PathBuf> = list
                    .into_iter()
                    .filter(|archive| !self.consumed.contains(archive))
                    .collect();
                if !new.is_empty() {
                    fresh.insert(dir, new);
                }
            }
            if fresh.is_empty() {
                break;
            }
            self.extract_groups(&fresh, true)?;
            for (dir, list) in fresh {
                self.extras.entry(dir).or_default().extend(list);
            }
        }
        Ok(())
    }

    /// Extracts every archive in `groups`. Nested archives unpack into
    /// their own containing directory so the revealed layout stays intact.
    fn extract_groups(&mut self, groups: &ArchiveList, nested: bool) -> Result<()> {
        for (dir, group) in groups {
            let output_dir = if nested { dir.clone() } else { self.output.clone() };
            for archive in group {
                self.extract_one(archive, &output_dir)?;
            }
        }
        Ok(())
    }

    fn extract_one(&mut self, archive: &Path, output_dir: &Path) -> Result<()> {
        let kind = detect::detect(archive).map_err(|err| self.fail(archive, None, err))?;
        if kind == ArchiveType::Iso {
            // No ISO9660 decoder is registered. The image is left in
            // place rather than failing the job, and recursion is
            // suppressed for the rest of the job unless explicitly
            // re-enabled.
            self.saw_iso = true;
            self.consumed.insert(archive.to_path_buf());
            self.totals
                .warnings
                .push(format!("skipped ISO image {}", archive.display()));
            return Ok(());
        }
        let request = ExtractionRequest {
            source: archive.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            file_mode: self.job.file_mode,
            dir_mode: self.job.dir_mode,
            password: None,
            passwords: self.job.passwords.clone(),
            file_workers: self.job.file_workers,
            progress: self.job.progress.clone(),
        };

        let extraction = api::extract_as(kind, &request)
            .map_err(|err| self.fail(archive, Some(kind), err))?;
        self.consumed.extend(extraction.archives.iter().cloned());
        self.totals.absorb(extraction);
        Ok(())
    }

    fn fail(&self, archive: &Path, kind: Option<ArchiveType>, cause: ExtractError) -> ExtractError {
        let mut failure = JobFailure::new(archive.to_path_buf(), self.output.clone());
        failure.bytes_written = self.totals.size;
        failure.archive_type = kind;
        failure.warnings = self.totals.warnings.clone();
        failure.push_cause(cause);
        failure.into_error()
    }

    /// No partial archive is left half-extracted: everything this job
    /// wrote to its output area is removed before the error propagates.
    fn scrub_output(&self) {
        if self.created_output {
            let _ = std::fs::remove_dir_all(&self.output);
        } else {
            for file in &self.totals.files {
                let _ = std::fs::remove_file(file);
            }
        }
    }

    fn cleanup(&mut self, wall_start: SystemTime, started: Instant) -> Result<()> {
        if self.job.log_file {
            self.write_manifest(wall_start, started.elapsed());
        }
        if self.job.delete_originals {
            self.delete_originals();
        }

        if self.job.output.is_none() {
            if self.job.keep_temp {
                self.rename_temp()?;
            } else {
                std::thread::sleep(SETTLE_DELAY);
                self.relocate()?;
            }
        }
        self.remove_root_if_empty();
        Ok(())
    }

    /// Manifest failures are warnings, not job failures; the extracted
    /// files are already on disk and correct.
    fn write_manifest(&mut self, wall_start: SystemTime, elapsed: Duration) {
        let manifest = Manifest {
            root: self.job.root.clone(),
            output: self.output.clone(),
            started_unix: wall_start
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            elapsed_ms: elapsed.as_millis(),
            size: self.totals.size,
            archives: self.totals.archives.clone(),
            files: self.totals.files.clone(),
        };
        let path = self.output.join(manifest_name(&self.job.root));
        match serde_json::to_vec_pretty(&manifest) {
            Ok(bytes) => {
                if let Err(err) = std::fs::write(&path, bytes) {
                    tracing::warn!(path = %path.display(), error = %err, "manifest write failed");
                } else {
                    self.totals.files.push(path);
                }
            }
            Err(err) => tracing::warn!(error = %err, "manifest serialization failed"),
        }
    }

    fn delete_originals(&self) {
        for archive in &self.totals.archives {
            if let Err(err) = std::fs::remove_file(archive) {
                tracing::warn!(archive = %archive.display(), error = %err, "could not delete original");
            }
        }
    }

    /// Moves everything out of the temp folder back into the search root,
    /// then removes the temp folder. An existing destination is never
    /// overwritten unless the job asks; the extracted copy stays in the
    /// temp folder instead, and the temp folder is kept.
    fn relocate(&mut self) -> Result<()> {
        let mut moved: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut leftovers = 0usize;

        let files: Vec<PathBuf> = walkdir::WalkDir::new(&self.output)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .collect();

        for path in files {
            let Ok(rel) = path.strip_prefix(&self.output).map(Path::to_path_buf) else {
                continue;
            };
            let dest = self.job.root.join(&rel);
            if dest.exists() && !self.job.overwrite {
                tracing::warn!(dest = %dest.display(), "destination exists, keeping extracted copy in temp folder");
                leftovers += 1;
                continue;
            }
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            move_file(&path, &dest)?;
            moved.insert(path, dest);
        }

        for file in &mut self.totals.files {
            if let Some(dest) = moved.get(file) {
                *file = dest.clone();
            }
        }

        if leftovers == 0 {
            std::fs::remove_dir_all(&self.output)?;
            self.output = self.job.root.clone();
        }
        Ok(())
    }

    /// Renames the kept temp folder to the root name with the suffix
    /// stripped, falling back to `.0`, `.1`, … on collisions. The search
    /// root itself always exists, so the first free candidate is normally
    /// `<root>.0`.
    fn rename_temp(&mut self) -> Result<()> {
        let base = self.job.root.clone();
        let mut target = base.clone();
        let mut attempt = 0usize;
        while target.exists() {
            if attempt >= MAX_RENAME_ATTEMPTS {
                tracing::warn!(output = %self.output.display(), "no free name for temp folder, keeping it as is");
                return Ok(());
            }
            target = numbered(&base, attempt);
            attempt += 1;
        }
        std::fs::rename(&self.output, &target)?;
        for file in &mut self.totals.files {
            if let Ok(rel) = file.strip_prefix(&self.output).map(Path::to_path_buf) {
                *file = target.join(rel);
            }
        }
        self.output = target;
        Ok(())
    }

    fn remove_root_if_empty(&self) {
        if self.output == self.job.root {
            return;
        }
        let Ok(mut entries) = std::fs::read_dir(&self.job.root) else {
            return;
        };
        if entries.next().is_none() {
            let _ = std::fs::remove_dir(&self.job.root);
        }
    }

    fn notify_finish(self, elapsed: Duration, error: Option<ExtractError>) {
        let notifier = self.job.notifier.clone();
        let response = Response {
            done: true,
            root: self.job.root,
            output: self.output,
            queue_depth: 0,
            archives: self.archives,
            extras: self.extras,
            size: self.totals.size,
            files: self.totals.files,
            elapsed,
            warnings: self.totals.warnings,
            error,
        };

        match notifier {
            Some(notifier) => notifier.deliver(response),
            // Best-effort summary for callers that asked for no
            // notifications at all.
            None => match &response.error {
                Some(err) => tracing::error!(
                    root = %response.root.display(),
                    error = %err,
                    "extraction job failed"
                ),
                None => tracing::info!(
                    root = %response.root.display(),
                    size = response.size,
                    files = response.files.len(),
                    "extraction job finished"
                ),
            },
        }
    }
}

/// `<root>_unarc`, the derived temporary output folder.
fn temp_path(root: &Path) -> PathBuf {
    let mut name = root.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

fn numbered(base: &Path, attempt: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{attempt}"));
    PathBuf::from(name)
}

fn manifest_name(root: &Path) -> String {
    let stem = root
        .file_name()
        .map_or_else(|| "job".into(), |name| name.to_string_lossy().into_owned());
    format!("{stem}{TEMP_SUFFIX}.json")
}

fn move_file(src: &Path, dest: &Path) -> Result<()> {
    if std::fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    // Cross-device fallback.
    std::fs::copy(src, dest)?;
    std::fs::remove_file(src)?;
    Ok(())
}

#[derive(Serialize)]
struct Manifest {
    root: PathBuf,
    output: PathBuf,
    started_unix: u64,
    elapsed_ms: u128,
    size: u64,
    archives: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    use crate::queue::job::Notifier;

    fn build_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, contents) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap();
    }

    fn channel_job(root: &Path) -> (Job, crossbeam_channel::Receiver<Response>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let extract_job = Job {
            root: root.to_path_buf(),
            notifier: Some(Notifier::Channel(tx)),
            ..Job::default()
        };
        (extract_job, rx)
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/data/incoming")),
            PathBuf::from("/data/incoming_unarc")
        );
        assert_eq!(numbered(Path::new("/data/incoming"), 3), PathBuf::from("/data/incoming.3"));
        assert_eq!(manifest_name(Path::new("/data/incoming")), "incoming_unarc.json");
    }

    #[test]
    fn test_empty_root_fails_with_no_compressed_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("empty");
        std::fs::create_dir(&root).unwrap();

        let (extract_job, rx) = channel_job(&root);
        run(extract_job, 0);

        let start = rx.recv().unwrap();
        assert!(!start.done);
        assert!(start.archives.is_empty());
        let finish = rx.recv().unwrap();
        assert!(finish.done);
        assert!(matches!(
            finish.error,
            Some(ExtractError::NoCompressedFiles { .. })
        ));
    }

    #[test]
    fn test_successful_job_relocates_and_removes_temp() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("incoming");
        std::fs::create_dir(&root).unwrap();
        build_zip(&root.join("bundle.zip"), &[("payload.txt", b"twelve bytes")]);

        let (extract_job, rx) = channel_job(&root);
        run(extract_job, 2);

        let start = rx.recv().unwrap();
        assert!(!start.done);
        assert_eq!(start.queue_depth, 2);
        assert_eq!(discover::archive_count(&start.archives), 1);

        let finish = rx.recv().unwrap();
        assert!(finish.succeeded());
        assert_eq!(finish.size, 12);
        assert_eq!(finish.files, vec![root.join("payload.txt")]);
        assert_eq!(std::fs::read(root.join("payload.txt")).unwrap(), b"twelve bytes");
        assert!(!temp_path(&root).exists());
        // Original archive is kept unless deletion was requested.
        assert!(root.join("bundle.zip").exists());
    }

    #[test]
    fn test_keep_temp_renames_with_collision_suffix() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("incoming");
        std::fs::create_dir(&root).unwrap();
        build_zip(&root.join("bundle.zip"), &[("payload.txt", b"data")]);

        let (mut extract_job, rx) = channel_job(&root);
        extract_job.keep_temp = true;
        run(extract_job, 0);

        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.succeeded());
        // The root itself occupies the stripped name, so the kept folder
        // lands on the first numbered candidate.
        let kept = numbered(&root, 0);
        assert_eq!(finish.output, kept);
        assert_eq!(finish.files, vec![kept.join("payload.txt")]);
        assert!(kept.join("payload.txt").exists());
        assert!(!temp_path(&root).exists());
    }

    #[test]
    fn test_nested_archive_is_recursed_and_reported_as_extra() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("incoming");
        std::fs::create_dir(&root).unwrap();

        // bundle.zip contains inner.zip which contains the real payload.
        let inner = {
            let mut buffer = Vec::new();
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("kernel.txt", options).unwrap();
            writer.write_all(b"innermost").unwrap();
            writer.finish().unwrap();
            buffer
        };
        let file = std::fs::File::create(root.join("bundle.zip")).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("inner.zip", options).unwrap();
        writer.write_all(&inner).unwrap();
        writer.finish().unwrap();

        let (extract_job, rx) = channel_job(&root);
        run(extract_job, 0);

        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.succeeded());
        assert_eq!(discover::archive_count(&finish.extras), 1);
        assert!(finish.files.iter().any(|f| f.ends_with("kernel.txt")));
        assert_eq!(std::fs::read(root.join("kernel.txt")).unwrap(), b"innermost");
    }

    #[test]
    fn test_no_recurse_leaves_nested_archive_packed() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("incoming");
        std::fs::create_dir(&root).unwrap();

        let inner = {
            let mut buffer = Vec::new();
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("kernel.txt", options).unwrap();
            writer.write_all(b"innermost").unwrap();
            writer.finish().unwrap();
            buffer
        };
        let file = std::fs::File::create(root.join("bundle.zip")).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("inner.zip", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&inner).unwrap();
        writer.finish().unwrap();

        let (mut extract_job, rx) = channel_job(&root);
        extract_job.no_recurse = true;
        run(extract_job, 0);

        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.succeeded());
        assert!(finish.extras.is_empty());
        assert!(root.join("inner.zip").exists());
        assert!(!root.join("kernel.txt").exists());
    }

    #[test]
    fn test_delete_originals_removes_consumed_archives() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("incoming");
        std::fs::create_dir(&root).unwrap();
        build_zip(&root.join("bundle.zip"), &[("payload.txt", b"data")]);

        let (mut extract_job, rx) = channel_job(&root);
        extract_job.delete_originals = true;
        run(extract_job, 0);

        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.succeeded());
        assert!(!root.join("bundle.zip").exists());
        assert!(root.join("payload.txt").exists());
    }

    #[test]
    fn test_iso_alongside_archives_does_not_fail_job() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("incoming");
        std::fs::create_dir(&root).unwrap();
        build_zip(&root.join("bundle.zip"), &[("payload.txt", b"real data")]);
        std::fs::write(root.join("disc.iso"), b"not a decodable image").unwrap();

        let (extract_job, rx) = channel_job(&root);
        run(extract_job, 0);

        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.succeeded(), "job failed: {:?}", finish.error);
        assert_eq!(std::fs::read(root.join("payload.txt")).unwrap(), b"real data");
        assert!(root.join("disc.iso").exists());
        assert!(!temp_path(&root).exists());
        assert!(finish.warnings.iter().any(|w| w.contains("disc.iso")));
    }

    #[test]
    fn test_iso_suppresses_recursion_unless_allowed() {
        let build_root = |name: &str, temp: &TempDir| -> PathBuf {
            let root = temp.path().join(name);
            std::fs::create_dir(&root).unwrap();
            let inner = {
                let mut buffer = Vec::new();
                let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
                let options = zip::write::SimpleFileOptions::default();
                writer.start_file("kernel.txt", options).unwrap();
                writer.write_all(b"innermost").unwrap();
                writer.finish().unwrap();
                buffer
            };
            let file = std::fs::File::create(root.join("bundle.zip")).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer
                .start_file("inner.zip", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&inner).unwrap();
            writer.finish().unwrap();
            std::fs::write(root.join("disc.iso"), b"image").unwrap();
            root
        };

        let temp = TempDir::new().unwrap();

        // Default: the ISO disables the nested re-scan.
        let root = build_root("suppressed", &temp);
        let (extract_job, rx) = channel_job(&root);
        run(extract_job, 0);
        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.succeeded(), "job failed: {:?}", finish.error);
        assert!(finish.extras.is_empty());
        assert!(root.join("inner.zip").exists());
        assert!(!root.join("kernel.txt").exists());

        // Opting in restores the re-scan.
        let root = build_root("allowed", &temp);
        let (mut extract_job, rx) = channel_job(&root);
        extract_job.allow_iso_recursion = true;
        run(extract_job, 0);
        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.succeeded(), "job failed: {:?}", finish.error);
        assert_eq!(discover::archive_count(&finish.extras), 1);
        assert_eq!(std::fs::read(root.join("kernel.txt")).unwrap(), b"innermost");
    }

    #[test]
    fn test_failed_job_scrubs_temp_area() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("incoming");
        std::fs::create_dir(&root).unwrap();
        build_zip(&root.join("good.zip"), &[("fine.txt", b"ok")]);
        // Sorts after good.zip, so the good archive extracts first.
        std::fs::write(root.join("ruined.zip"), b"PK\x03\x04 truncated garbage").unwrap();

        let (extract_job, rx) = channel_job(&root);
        run(extract_job, 0);

        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.error.is_some());
        assert!(!temp_path(&root).exists());
        assert!(!root.join("fine.txt").exists());

        match finish.error {
            Some(ExtractError::Job(failure)) => {
                assert!(failure.archive.ends_with("ruined.zip"));
                assert_eq!(failure.archive_type, Some(ArchiveType::Zip));
                assert!(!failure.causes.is_empty());
            }
            other => panic!("expected aggregated job failure, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_output_skips_relocation() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("incoming");
        let target = temp.path().join("target");
        std::fs::create_dir(&root).unwrap();
        build_zip(&root.join("bundle.zip"), &[("payload.txt", b"data")]);

        let (mut extract_job, rx) = channel_job(&root);
        extract_job.output = Some(target.clone());
        run(extract_job, 0);

        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.succeeded());
        assert_eq!(finish.output, target);
        assert!(target.join("payload.txt").exists());
        assert!(!root.join("payload.txt").exists());
    }

    #[test]
    fn test_log_file_writes_manifest() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("incoming");
        std::fs::create_dir(&root).unwrap();
        build_zip(&root.join("bundle.zip"), &[("payload.txt", b"data")]);

        let (mut extract_job, rx) = channel_job(&root);
        extract_job.log_file = true;
        run(extract_job, 0);

        let _start = rx.recv().unwrap();
        let finish = rx.recv().unwrap();
        assert!(finish.succeeded());

        let manifest_path = root.join("incoming_unarc.json");
        assert!(finish.files.contains(&manifest_path));
        let manifest: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["size"], 4);
        assert_eq!(manifest["archives"].as_array().unwrap().len(), 1);
    }
}
