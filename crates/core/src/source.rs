//! Local source tree scanning

use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Reason recorded for entries whose relative path cannot become a key
pub const NON_UTF8_REASON: &str = "file name is not valid UTF-8";

/// A regular file found under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path on disk
    pub path: PathBuf,
    /// Object key: path relative to the root, `/`-separated
    pub key: String,
    /// Size in bytes at scan time
    pub size: u64,
}

/// An entry the walk could not read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableEntry {
    pub path: PathBuf,
    pub key: String,
    pub reason: String,
}

/// Every regular file under a source root, sorted by key
#[derive(Debug, Clone)]
pub struct SourceTree {
    pub root: PathBuf,
    pub files: Vec<SourceFile>,
    pub unreadable: Vec<UnreadableEntry>,
}

impl SourceTree {
    /// Walk `root` recursively and collect its regular files.
    ///
    /// Fails only when `root` is missing or is not a directory. Entries that
    /// cannot be read are recorded in `unreadable` and the walk goes on.
    /// Directory symlinks are not followed; a symlink pointing at a regular
    /// file is kept under the link's own key.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::SourceNotFound(root.to_path_buf()));
        }

        let mut files = Vec::new();
        let mut unreadable = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    warn!(path = %path.display(), error = %err, "Skipping unreadable entry");
                    unreadable.push(UnreadableEntry {
                        key: object_key(root, &path).unwrap_or_else(|| path.display().to_string()),
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let path = entry.path();
            let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && path.is_file());
            if !is_file {
                continue;
            }

            let Some(key) = object_key(root, path) else {
                if let Some(relative) = path.strip_prefix(root).ok().filter(|r| r.to_str().is_none()) {
                    warn!(path = %path.display(), "Skipping file with non UTF-8 name");
                    unreadable.push(UnreadableEntry {
                        path: path.to_path_buf(),
                        key: relative.display().to_string(),
                        reason: NON_UTF8_REASON.to_string(),
                    });
                }
                continue;
            };

            match fs::metadata(path) {
                Ok(metadata) => {
                    debug!(key = %key, size = metadata.len(), "Found file");
                    files.push(SourceFile {
                        path: path.to_path_buf(),
                        key,
                        size: metadata.len(),
                    });
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Cannot stat file");
                    unreadable.push(UnreadableEntry {
                        path: path.to_path_buf(),
                        key,
                        reason: err.to_string(),
                    });
                }
            }
        }

        files.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(Self {
            root: root.to_path_buf(),
            files,
            unreadable,
        })
    }

    /// Number of files found
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of file sizes at scan time
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Object key for `path` relative to `root`, joined with `/` on every platform.
///
/// Returns `None` if `path` is not under `root`, is `root` itself, or has a
/// component that is not valid UTF-8.
pub fn object_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_str()?);
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
