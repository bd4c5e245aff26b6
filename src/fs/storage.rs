// src/fs/storage.rs

//! Static-file storage as seen by the host's file server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{trace, warn};

use super::FileSystem;
use crate::watch::path_utils::to_slash;
use crate::watch::PathFilter;

/// One file or directory in static storage.
///
/// `path` is rooted at the storage root and `/`-separated, e.g.
/// `/ts/app.js`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StaticEntry {
    pub path: String,
    pub is_dir: bool,
}

impl StaticEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }
}

/// The two entry points a static file server needs.
pub trait StaticStorage: Send + Sync {
    /// The entry at `path`, if any.
    fn lookup(&self, path: &str) -> Option<StaticEntry>;

    /// Direct children of the directory at `dir`, sorted by path. Missing or
    /// non-directory paths list as empty.
    fn list(&self, dir: &str) -> Vec<StaticEntry>;
}

impl<S: StaticStorage + ?Sized> StaticStorage for Arc<S> {
    fn lookup(&self, path: &str) -> Option<StaticEntry> {
        (**self).lookup(path)
    }

    fn list(&self, dir: &str) -> Vec<StaticEntry> {
        (**self).list(dir)
    }
}

/// [`StaticStorage`] over a [`FileSystem`] rooted at a directory.
///
/// Entries inside the excluded directory (when a filter is set) are neither
/// found nor listed.
#[derive(Debug, Clone)]
pub struct FsStaticStorage {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    filter: Option<PathFilter>,
}

impl FsStaticStorage {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path onto the root. `..` segments are refused.
    fn resolve(&self, path: &str) -> Option<(PathBuf, String)> {
        let mut full = self.root.clone();
        let mut segments = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    trace!(path, "refusing parent traversal");
                    return None;
                }
                s => {
                    full.push(s);
                    segments.push(s);
                }
            }
        }
        let rel = segments.join("/");
        if self.is_filtered(&rel) {
            return None;
        }
        Some((full, format!("/{rel}")))
    }

    fn is_filtered(&self, rel: &str) -> bool {
        self.filter.as_ref().is_some_and(|f| f.is_excluded(rel))
    }
}

impl StaticStorage for FsStaticStorage {
    fn lookup(&self, path: &str) -> Option<StaticEntry> {
        let (full, rel) = self.resolve(path)?;
        if self.fs.is_file(&full) {
            Some(StaticEntry::file(rel))
        } else if self.fs.is_dir(&full) {
            Some(StaticEntry::dir(rel))
        } else {
            None
        }
    }

    fn list(&self, dir: &str) -> Vec<StaticEntry> {
        let Some((full, _)) = self.resolve(dir) else {
            return Vec::new();
        };
        if !self.fs.is_dir(&full) {
            return Vec::new();
        }

        let children = match self.fs.read_dir(&full) {
            Ok(children) => children,
            Err(e) => {
                warn!(dir = ?full, error = %e, "listing static directory failed");
                return Vec::new();
            }
        };

        let mut entries: Vec<StaticEntry> = children
            .into_iter()
            .filter_map(|child| {
                let rel = to_slash(child.strip_prefix(&self.root).ok()?);
                if self.is_filtered(&rel) {
                    return None;
                }
                let path = format!("/{rel}");
                Some(if self.fs.is_dir(&child) {
                    StaticEntry::dir(path)
                } else {
                    StaticEntry::file(path)
                })
            })
            .collect();
        entries.sort();
        entries
    }
}
