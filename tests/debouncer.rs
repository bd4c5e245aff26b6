// tests/debouncer.rs
mod common;
use crate::common::{init_tracing, with_timeout};

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use devreload::watch::{
    spawn_debouncer, ChangeBatch, ChangeEvent, ChangeKind, DebouncerExit, PathFilter, WatchMessage,
};

const QUIET: Duration = Duration::from_millis(150);

struct Harness {
    events: mpsc::Sender<WatchMessage>,
    batches: mpsc::UnboundedReceiver<ChangeBatch>,
    handle: tokio::task::JoinHandle<DebouncerExit>,
}

fn start() -> Harness {
    start_filtered(PathFilter::new("node_modules"))
}

fn start_filtered(filter: PathFilter) -> Harness {
    init_tracing();
    let (events_tx, events_rx) = mpsc::channel(64);
    let (batch_tx, batch_rx) = mpsc::unbounded_channel();
    let handle = spawn_debouncer(QUIET, filter, events_rx, batch_tx);
    Harness {
        events: events_tx,
        batches: batch_rx,
        handle,
    }
}

fn paths(batch: &ChangeBatch) -> Vec<PathBuf> {
    batch.events().iter().map(|e| e.path.clone()).collect()
}

async fn no_batch_within(batches: &mut mpsc::UnboundedReceiver<ChangeBatch>, limit: Duration) -> bool {
    timeout(limit, batches.recv()).await.is_err()
}

#[tokio::test]
async fn burst_produces_exactly_one_batch_in_arrival_order() {
    let mut h = start();

    for name in ["a.ts", "b.ts", "a.ts", "c.ts"] {
        h.events
            .send(WatchMessage::Change(ChangeEvent::modified(format!("/src/{name}"))))
            .await
            .unwrap();
    }
    h.events
        .send(WatchMessage::Change(ChangeEvent::deleted("/src/b.ts")))
        .await
        .unwrap();

    let batch = with_timeout(h.batches.recv()).await.expect("one batch");
    assert_eq!(
        paths(&batch),
        ["/src/a.ts", "/src/b.ts", "/src/a.ts", "/src/c.ts", "/src/b.ts"]
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<_>>()
    );
    assert_eq!(batch.events()[4].kind, ChangeKind::Deleted);

    assert!(no_batch_within(&mut h.batches, QUIET * 3).await);
}

#[tokio::test]
async fn every_event_restarts_the_quiet_period() {
    let mut h = start();

    // Six events spaced well inside the quiet period span far more than one
    // quiet period in total.
    for i in 0..6 {
        h.events
            .send(WatchMessage::Change(ChangeEvent::modified(format!("/src/{i}.ts"))))
            .await
            .unwrap();
        sleep(QUIET / 3).await;
    }

    let batch = with_timeout(h.batches.recv()).await.expect("one batch");
    assert_eq!(batch.len(), 6);
    assert!(no_batch_within(&mut h.batches, QUIET * 3).await);
}

#[tokio::test]
async fn separated_bursts_become_separate_batches() {
    let mut h = start();

    h.events
        .send(WatchMessage::Change(ChangeEvent::modified("/src/one.ts")))
        .await
        .unwrap();
    let first = with_timeout(h.batches.recv()).await.expect("first batch");

    h.events
        .send(WatchMessage::Change(ChangeEvent::created("/src/two.ts")))
        .await
        .unwrap();
    let second = with_timeout(h.batches.recv()).await.expect("second batch");

    assert_eq!(paths(&first), vec![PathBuf::from("/src/one.ts")]);
    assert_eq!(paths(&second), vec![PathBuf::from("/src/two.ts")]);
}

#[tokio::test]
async fn excluded_paths_never_reach_a_batch() {
    let mut h = start();

    h.events
        .send(WatchMessage::Change(ChangeEvent::modified("/src/node_modules/x/index.ts")))
        .await
        .unwrap();
    assert!(no_batch_within(&mut h.batches, QUIET * 3).await);

    h.events
        .send(WatchMessage::Change(ChangeEvent::modified("/src/NODE_MODULES/y.ts")))
        .await
        .unwrap();
    h.events
        .send(WatchMessage::Change(ChangeEvent::modified("/src/app.ts")))
        .await
        .unwrap();
    let batch = with_timeout(h.batches.recv()).await.expect("batch");
    assert_eq!(paths(&batch), vec![PathBuf::from("/src/app.ts")]);
}

#[tokio::test]
async fn excluded_name_above_the_source_root_is_ignored() {
    let root = "/home/dev/node_modules/site/scripts";
    let mut h = start_filtered(PathFilter::new("node_modules").relative_to(root));

    h.events
        .send(WatchMessage::Change(ChangeEvent::modified(format!("{root}/node_modules/dep.ts"))))
        .await
        .unwrap();
    h.events
        .send(WatchMessage::Change(ChangeEvent::modified(format!("{root}/app.ts"))))
        .await
        .unwrap();

    let batch = with_timeout(h.batches.recv()).await.expect("batch");
    assert_eq!(paths(&batch), vec![PathBuf::from(format!("{root}/app.ts"))]);
}

#[tokio::test]
async fn rename_out_of_excluded_dir_keeps_the_new_side() {
    let mut h = start();

    h.events
        .send(WatchMessage::Change(ChangeEvent::renamed(
            "/src/node_modules/tmp.ts",
            "/src/app.ts",
        )))
        .await
        .unwrap();

    let batch = with_timeout(h.batches.recv()).await.expect("batch");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.events()[0].kind, ChangeKind::Created);
    assert_eq!(batch.events()[0].path, PathBuf::from("/src/app.ts"));
}

#[tokio::test]
async fn watch_failure_stops_the_debouncer() {
    let h = start();

    h.events
        .send(WatchMessage::Failed("watched directory removed".to_string()))
        .await
        .unwrap();

    let exit = with_timeout(h.handle).await.unwrap();
    assert_eq!(exit, DebouncerExit::WatchFailed("watched directory removed".to_string()));
}

#[tokio::test]
async fn closing_the_event_channel_ends_the_task() {
    let h = start();
    drop(h.events);

    let exit = with_timeout(h.handle).await.unwrap();
    assert_eq!(exit, DebouncerExit::ChannelClosed);
}

#[tokio::test]
async fn dropped_batch_receiver_is_reported() {
    let h = start();
    drop(h.batches);

    h.events
        .send(WatchMessage::Change(ChangeEvent::modified("/src/a.ts")))
        .await
        .unwrap();

    let exit = with_timeout(h.handle).await.unwrap();
    assert_eq!(exit, DebouncerExit::CompilerGone);
}
