// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobMatcher};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::errors::Result;
use crate::watch::event::{translate, WatchMessage};
use crate::watch::path_utils::relative_str;

/// Selects compilable sources under the watched root (e.g. `**/*.ts`).
#[derive(Debug, Clone)]
pub struct SourceMatcher {
    root: PathBuf,
    glob: GlobMatcher,
}

impl SourceMatcher {
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        let glob = Glob::new(pattern)
            .with_context(|| format!("compiling source glob '{pattern}'"))?
            .compile_matcher();
        Ok(Self {
            root: root.into(),
            glob,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True if `path` is under the root and matches the glob.
    pub fn matches(&self, path: &Path) -> bool {
        match relative_str(&self.root, path) {
            Some(rel) => !rel.is_empty() && self.glob.is_match(&rel),
            None => false,
        }
    }
}

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle stops file watching and closes the
/// sending side of the event channel.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// Stop watching.
    pub fn stop(self) {
        debug!(root = ?self.root, "stopping file watcher");
    }
}

/// Spawn a filesystem watcher that observes `matcher.root()` recursively and
/// pushes [`WatchMessage`]s into `tx`.
///
/// `notify` calls back on its own thread; the callback only translates and
/// forwards, applying backpressure through the bounded channel. Removal of
/// the watched root and watcher errors are forwarded as
/// [`WatchMessage::Failed`].
pub fn spawn_watcher(matcher: SourceMatcher, tx: mpsc::Sender<WatchMessage>) -> Result<WatcherHandle> {
    let root = matcher.root().to_path_buf();

    let callback_root = root.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let messages = match res {
                Ok(event) => messages_for(&callback_root, &matcher, event),
                Err(err) => vec![WatchMessage::Failed(err.to_string())],
            };
            for message in messages {
                trace!(?message, "forwarding watch message");
                if tx.blocking_send(message).is_err() {
                    // Receiver gone: the supervisor is shutting down.
                    return;
                }
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    Ok(WatcherHandle {
        _inner: watcher,
        root,
    })
}

fn messages_for(root: &Path, matcher: &SourceMatcher, event: Event) -> Vec<WatchMessage> {
    if matches!(event.kind, EventKind::Remove(_)) && event.paths.iter().any(|p| p == root) {
        return vec![WatchMessage::Failed(format!(
            "watched directory {:?} was removed",
            root
        ))];
    }

    translate(event)
        .into_iter()
        .filter_map(|change| change.retain_paths(|p| matcher.matches(p)))
        .map(WatchMessage::Change)
        .collect()
}
