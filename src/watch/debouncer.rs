// src/watch/debouncer.rs

//! Quiet-period batching of change events.
//!
//! A single task owns the pending batch and the timer, so no lock is needed:
//! the watch layer pushes into a bounded channel and this task is its only
//! consumer. Every admitted event re-arms the timer (debounce, not
//! throttle). When the timer fires the pending events are swapped out and
//! sent to the compile worker, which runs concurrently with accumulation of
//! the next batch.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, trace};

use crate::watch::event::{ChangeBatch, ChangeEvent, WatchMessage};
use crate::watch::filter::PathFilter;

/// Why the debouncer loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebouncerExit {
    /// The watch side hung up (normal shutdown).
    ChannelClosed,
    /// The watch primitive failed; compilation stays off for this run.
    WatchFailed(String),
    /// Nobody is receiving batches any more.
    CompilerGone,
}

/// Spawn the debouncer task.
pub fn spawn_debouncer(
    quiet_period: Duration,
    filter: PathFilter,
    events: mpsc::Receiver<WatchMessage>,
    batches: mpsc::UnboundedSender<ChangeBatch>,
) -> JoinHandle<DebouncerExit> {
    tokio::spawn(run_debouncer(quiet_period, filter, events, batches))
}

async fn run_debouncer(
    quiet_period: Duration,
    filter: PathFilter,
    mut events: mpsc::Receiver<WatchMessage>,
    batches: mpsc::UnboundedSender<ChangeBatch>,
) -> DebouncerExit {
    let mut pending: Vec<ChangeEvent> = Vec::new();
    let timer = sleep(quiet_period);
    tokio::pin!(timer);
    let mut armed = false;

    debug!(?quiet_period, "debouncer started");

    loop {
        tokio::select! {
            message = events.recv() => match message {
                Some(WatchMessage::Change(change)) => {
                    match change.retain_paths(|p| !filter.is_excluded(p)) {
                        Some(change) => {
                            trace!(path = ?change.path, kind = ?change.kind, "queued change");
                            pending.push(change);
                            timer.as_mut().reset(Instant::now() + quiet_period);
                            armed = true;
                        }
                        None => trace!("change inside excluded directory ignored"),
                    }
                }
                Some(WatchMessage::Failed(reason)) => {
                    error!(%reason, "file watching failed; compilation disabled until restart");
                    return DebouncerExit::WatchFailed(reason);
                }
                None => {
                    if !pending.is_empty() {
                        debug!(dropped = pending.len(), "watch channel closed with pending changes");
                    }
                    return DebouncerExit::ChannelClosed;
                }
            },
            () = &mut timer, if armed => {
                armed = false;
                let batch = ChangeBatch::new(std::mem::take(&mut pending));
                debug!(events = batch.len(), "quiet period elapsed; flushing batch");
                if batches.send(batch).is_err() {
                    return DebouncerExit::CompilerGone;
                }
            }
        }
    }
}
