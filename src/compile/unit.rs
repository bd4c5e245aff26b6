// src/compile/unit.rs

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::watch::{ChangeBatch, ChangeKind};

/// Maps a source file to the output it produces: same relative path under
/// the output root, extension swapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMapper {
    source_root: PathBuf,
    output_root: PathBuf,
    extension: String,
}

impl OutputMapper {
    pub fn new(
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        extension: impl AsRef<str>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            extension: extension.as_ref().trim_start_matches('.').to_string(),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Output path for `source`, or `None` if it is not under the source root.
    pub fn output_for(&self, source: &Path) -> Option<PathBuf> {
        let rel = source.strip_prefix(&self.source_root).ok()?;
        if rel.as_os_str().is_empty() {
            return None;
        }
        Some(self.output_root.join(rel).with_extension(&self.extension))
    }
}

/// Net work derived from one batch: sources to compile and stale outputs to
/// delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileUnit {
    pub to_compile: BTreeSet<PathBuf>,
    pub to_delete: BTreeSet<PathBuf>,
}

impl CompileUnit {
    /// Reduce a batch newest-first.
    ///
    /// The newest event for a path decides what happens to it; older events
    /// for the same path are dropped. A rename schedules the old path's output
    /// for deletion and the new path for compilation, each side subject to the
    /// same newest-wins rule.
    pub fn from_batch(batch: &ChangeBatch, mapper: &OutputMapper) -> Self {
        let mut unit = CompileUnit::default();
        let mut seen: HashSet<&Path> = HashSet::new();

        for event in batch.events().iter().rev() {
            if seen.insert(event.path.as_path()) {
                match event.kind {
                    ChangeKind::Modified | ChangeKind::Created | ChangeKind::Renamed => {
                        unit.to_compile.insert(event.path.clone());
                    }
                    ChangeKind::Deleted => unit.schedule_delete(&event.path, mapper),
                }
            }

            if let (ChangeKind::Renamed, Some(old)) = (event.kind, event.old_path.as_deref()) {
                if seen.insert(old) {
                    unit.schedule_delete(old, mapper);
                }
            }
        }

        unit
    }

    fn schedule_delete(&mut self, source: &Path, mapper: &OutputMapper) {
        match mapper.output_for(source) {
            Some(output) => {
                self.to_delete.insert(output);
            }
            None => warn!(
                source = ?source,
                root = ?mapper.source_root(),
                "deleted source is outside the source root; no output to remove"
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_compile.is_empty() && self.to_delete.is_empty()
    }
}
