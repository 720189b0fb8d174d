//! Archive discovery under a search root.
//!
//! The scan carries depth as data on an explicit work-list instead of
//! recursing, which keeps min/max depth enforcement uniform and immune to
//! pathological directory trees. Depth 1 is the search root itself.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::formats::detect;

/// Directory → ordered archive paths found directly in that directory.
///
/// Non-recursive per entry; recursion is represented by multiple map
/// entries. Every value is an absolute, cleaned path under the search
/// root, and no key maps to an empty list. Built fresh on each scan.
pub type ArchiveList = BTreeMap<PathBuf, Vec<PathBuf>>;

/// Discovery filters for one scan.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Suffixes to skip, compared case-insensitively against basenames.
    pub exclude_suffixes: Vec<String>,
    /// Shallowest directory level whose files are reported (1 = root).
    pub min_depth: usize,
    /// Deepest directory level visited (1 = root only).
    pub max_depth: usize,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            exclude_suffixes: Vec::new(),
            min_depth: 1,
            max_depth: usize::MAX,
        }
    }
}

impl Filter {
    fn admits_depth(&self, depth: usize) -> bool {
        depth >= self.min_depth.max(1) && depth <= self.max_depth
    }

    fn excludes(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return true;
        };
        let lowered = name.to_ascii_lowercase();
        self.exclude_suffixes
            .iter()
            .any(|suffix| lowered.ends_with(&suffix.to_ascii_lowercase()))
    }
}

/// Scans `root` for archive files, grouped by containing directory.
///
/// Unreadable directories are treated as containing nothing, so one bad
/// subdirectory never aborts a whole tree scan. Finding no archives at
/// all is *not* an error here; the job layer decides what that means.
///
/// # Errors
///
/// Only I/O failures resolving the root itself are reported.
pub fn find_compressed_files(root: &Path, filter: &Filter) -> Result<ArchiveList> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let mut list = ArchiveList::new();
    let mut work: Vec<(PathBuf, usize)> = vec![(root, 1)];

    while let Some((dir, depth)) = work.pop() {
        let Ok(reader) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut entries: Vec<_> = reader.flatten().collect();
        entries.sort_by_key(std::fs::DirEntry::file_name);

        let mut archives = Vec::new();
        for entry in entries {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if depth < filter.max_depth {
                    work.push((path, depth + 1));
                }
            } else if file_type.is_file()
                && filter.admits_depth(depth)
                && detect::by_extension(&path).is_some()
                && !filter.excludes(&path)
            {
                archives.push(path);
            }
        }

        if !archives.is_empty() {
            list.insert(dir, archives);
        }
    }
    Ok(list)
}

/// Total number of archives across all directory groups.
#[must_use]
pub fn archive_count(list: &ArchiveList) -> usize {
    list.values().map(Vec::len).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Lays out archives at depths 1 through 4:
    ///
    /// ```text
    /// root/top.zip                 depth 1
    /// root/one/first.tar.gz        depth 2
    /// root/one/two/second.7z       depth 3
    /// root/one/two/three/third.gz  depth 4
    /// root/one/notes.txt           (not an archive)
    /// ```
    fn build_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("one/two/three")).unwrap();
        std::fs::write(root.join("top.zip"), b"z").unwrap();
        std::fs::write(root.join("one/first.tar.gz"), b"z").unwrap();
        std::fs::write(root.join("one/two/second.7z"), b"z").unwrap();
        std::fs::write(root.join("one/two/three/third.gz"), b"z").unwrap();
        std::fs::write(root.join("one/notes.txt"), b"t").unwrap();
        temp
    }

    #[test]
    fn test_full_depth_scan_groups_by_directory() {
        let temp = build_tree();
        let list = find_compressed_files(temp.path(), &Filter::default()).unwrap();

        assert_eq!(list.len(), 4);
        assert_eq!(archive_count(&list), 4);
        for (dir, archives) in &list {
            assert!(!archives.is_empty());
            for archive in archives {
                assert!(archive.is_absolute());
                assert_eq!(archive.parent().unwrap(), dir);
            }
        }
    }

    #[test]
    fn test_max_depth_one_returns_only_root_archives() {
        let temp = build_tree();
        let filter = Filter {
            max_depth: 1,
            ..Filter::default()
        };
        let list = find_compressed_files(temp.path(), &filter).unwrap();
        assert_eq!(archive_count(&list), 1);
        let only = list.values().next().unwrap();
        assert!(only[0].ends_with("top.zip"));
    }

    #[test]
    fn test_min_depth_two_excludes_root_archives() {
        let temp = build_tree();
        let filter = Filter {
            min_depth: 2,
            ..Filter::default()
        };
        let list = find_compressed_files(temp.path(), &filter).unwrap();
        assert_eq!(archive_count(&list), 3);
        assert!(
            list.values()
                .flatten()
                .all(|archive| !archive.ends_with("top.zip"))
        );
    }

    #[test]
    fn test_pinned_depth_returns_exactly_that_level() {
        let temp = build_tree();
        let filter = Filter {
            min_depth: 3,
            max_depth: 3,
            ..Filter::default()
        };
        let list = find_compressed_files(temp.path(), &filter).unwrap();
        assert_eq!(archive_count(&list), 1);
        assert!(list.values().next().unwrap()[0].ends_with("second.7z"));
    }

    #[test]
    fn test_suffix_exclusion_removes_matching_archives() {
        let temp = build_tree();
        let filter = Filter {
            exclude_suffixes: vec![".zip".into(), ".GZ".into()],
            ..Filter::default()
        };
        let list = find_compressed_files(temp.path(), &filter).unwrap();
        assert_eq!(archive_count(&list), 1);
        assert!(list.values().next().unwrap()[0].ends_with("second.7z"));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let list =
            find_compressed_files(Path::new("/nonexistent/tree"), &Filter::default()).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_list_rebuilt_fresh_per_scan() {
        let temp = build_tree();
        let first = find_compressed_files(temp.path(), &Filter::default()).unwrap();
        std::fs::remove_file(temp.path().join("top.zip")).unwrap();
        let second = find_compressed_files(temp.path(), &Filter::default()).unwrap();
        assert_eq!(archive_count(&first), 4);
        assert_eq!(archive_count(&second), 3);
    }
}
