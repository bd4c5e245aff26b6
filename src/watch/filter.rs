// src/watch/filter.rs

//! Excluded-subtree predicate.

use std::path::{Component, Path, PathBuf};

/// Matches paths that live inside an excluded directory (e.g.
/// `node_modules`) at any depth.
///
/// Matching is per path component and case-insensitive, so
/// `scripts/NODE_MODULES/x.ts` is excluded while `node_modules2/x.ts` is not.
///
/// With a root set, only the components below the root are inspected: a
/// project checked out under `/home/me/node_modules/site` still sees its own
/// sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFilter {
    excluded: String,
    root: Option<PathBuf>,
}

impl PathFilter {
    pub fn new(excluded_dir: impl AsRef<str>) -> Self {
        Self {
            excluded: excluded_dir.as_ref().trim().to_lowercase(),
            root: None,
        }
    }

    /// Judge absolute paths relative to `root`. Paths outside it are judged
    /// as given.
    pub fn relative_to(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Name of the excluded directory (lowercased).
    pub fn excluded_dir(&self) -> &str {
        &self.excluded
    }

    pub fn is_excluded(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let path = match &self.root {
            Some(root) => path.strip_prefix(root).unwrap_or(path),
            None => path,
        };
        path.components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().to_lowercase() == self.excluded,
            _ => false,
        })
    }
}
