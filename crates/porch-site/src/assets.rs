//! Static asset copying.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::builder::BuildError;

/// Recursively copy `source` into `target`, overwriting existing files.
///
/// Returns the number of files copied. Entries that disappear while the tree
/// is being walked are skipped.
pub fn copy_tree(source: &Path, target: &Path) -> Result<usize, BuildError> {
    fs::create_dir_all(target).map_err(|e| BuildError::io(target, e))?;

    let mut copied = 0;

    for entry in WalkDir::new(source).follow_links(true).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_vanished(&e) => {
                tracing::debug!("Skipping vanished entry: {}", e);
                continue;
            }
            Err(e) => {
                let path = e.path().unwrap_or(source).to_path_buf();
                return Err(BuildError::io(&path, io::Error::other(e)));
            }
        };

        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(|e| BuildError::io(&destination, e))?;
            continue;
        }

        match fs::copy(entry.path(), &destination) {
            Ok(_) => copied += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !entry.path().exists() => {
                tracing::debug!("Skipping vanished file: {}", entry.path().display());
            }
            Err(e) => return Err(BuildError::io(&destination, e)),
        }
    }

    Ok(copied)
}

/// Whether a walk error means the entry was removed mid-walk.
pub(crate) fn is_vanished(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}
