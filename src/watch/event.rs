// src/watch/event.rs

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use notify::event::{EventKind, ModifyKind, RenameMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Modified,
    Created,
    Deleted,
    Renamed,
}

/// A single source-file change, produced by the watch layer and consumed
/// exactly once by the debouncer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub timestamp: SystemTime,
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// Previous location; only set for [`ChangeKind::Renamed`].
    pub old_path: Option<PathBuf>,
}

impl ChangeEvent {
    fn new(kind: ChangeKind, path: PathBuf, old_path: Option<PathBuf>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            path,
            kind,
            old_path,
        }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Modified, path.into(), None)
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Created, path.into(), None)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Deleted, path.into(), None)
    }

    pub fn renamed(old: impl Into<PathBuf>, new: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Renamed, new.into(), Some(old.into()))
    }

    /// Keep only the sides of this event whose path satisfies `keep`.
    ///
    /// A rename with only one interesting side degrades to a deletion of the
    /// old path or a creation of the new one.
    pub fn retain_paths(self, keep: impl Fn(&Path) -> bool) -> Option<ChangeEvent> {
        match (self.kind, self.old_path) {
            (ChangeKind::Renamed, Some(old)) => {
                match (keep(&old), keep(&self.path)) {
                    (true, true) => Some(ChangeEvent {
                        old_path: Some(old),
                        ..self
                    }),
                    (true, false) => Some(ChangeEvent {
                        kind: ChangeKind::Deleted,
                        path: old,
                        old_path: None,
                        ..self
                    }),
                    (false, true) => Some(ChangeEvent {
                        kind: ChangeKind::Created,
                        old_path: None,
                        ..self
                    }),
                    (false, false) => None,
                }
            }
            (kind, old_path) => keep(&self.path).then_some(ChangeEvent {
                kind,
                old_path,
                ..self
            }),
        }
    }
}

/// Messages flowing from the watch primitive into the debouncer.
#[derive(Debug, Clone)]
pub enum WatchMessage {
    Change(ChangeEvent),
    /// The watch primitive reported an error; no further events will be
    /// trusted for this supervisor run.
    Failed(String),
}

/// Events collected within one quiet period, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    events: Vec<ChangeEvent>,
}

impl ChangeBatch {
    pub fn new(events: Vec<ChangeEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Translate one raw `notify` event into change events.
///
/// Access and metadata-only notifications produce nothing.
pub fn translate(event: notify::Event) -> Vec<ChangeEvent> {
    let notify::Event { kind, paths, .. } = event;
    match kind {
        EventKind::Create(_) => paths.into_iter().map(ChangeEvent::created).collect(),
        EventKind::Remove(_) => paths.into_iter().map(ChangeEvent::deleted).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() == 2 => {
            let mut it = paths.into_iter();
            match (it.next(), it.next()) {
                (Some(old), Some(new)) => vec![ChangeEvent::renamed(old, new)],
                _ => Vec::new(),
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.into_iter().map(ChangeEvent::deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.into_iter().map(ChangeEvent::created).collect()
        }
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .into_iter()
            .map(|p| {
                if p.exists() {
                    ChangeEvent::created(p)
                } else {
                    ChangeEvent::deleted(p)
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) | EventKind::Access(_) => Vec::new(),
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => {
            paths.into_iter().map(ChangeEvent::modified).collect()
        }
    }
}
