//! Point-in-time modification-time snapshots of watched directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

/// Absolute file path to last modification time.
///
/// Two snapshots are equal only if they hold the same paths with the same
/// timestamps; any difference counts as a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, SystemTime>,
}

/// Paths that differ between two snapshots.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

impl SnapshotDiff {
    /// Total number of changed paths.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Snapshot {
    /// Record every regular file under `dirs`.
    ///
    /// Missing directories are skipped, as are subdirectories whose name is in
    /// `exclude`. Symlinks are followed, so a linked file is tracked by its
    /// target's modification time. Files that disappear between listing and
    /// stat are skipped.
    pub fn capture(dirs: &[PathBuf], exclude: &[String]) -> Self {
        let mut files = BTreeMap::new();

        for dir in dirs {
            let Ok(base) = fs::canonicalize(dir) else {
                continue;
            };
            if !base.is_dir() {
                continue;
            }

            let walker = WalkDir::new(&base)
                .follow_links(true)
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !is_excluded(entry, exclude));

            for entry in walker.filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }

                match entry.metadata().map(|m| m.modified()) {
                    Ok(Ok(modified)) => {
                        files.insert(entry.into_path(), modified);
                    }
                    _ => continue,
                }
            }
        }

        Self { files }
    }

    /// Number of files recorded.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Modification time recorded for `path`.
    pub fn get(&self, path: &Path) -> Option<SystemTime> {
        self.files.get(path).copied()
    }

    /// Compare against an older snapshot.
    pub fn diff(&self, previous: &Snapshot) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();

        for (path, modified) in &self.files {
            match previous.files.get(path) {
                None => diff.added.push(path.clone()),
                Some(old) if old != modified => diff.modified.push(path.clone()),
                Some(_) => {}
            }
        }

        diff.removed = previous
            .files
            .keys()
            .filter(|path| !self.files.contains_key(*path))
            .cloned()
            .collect();

        diff
    }
}

fn is_excluded(entry: &walkdir::DirEntry, exclude: &[String]) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| exclude.iter().any(|x| x == name))
}
