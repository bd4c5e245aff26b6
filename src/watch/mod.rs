// src/watch/mod.rs

//! File watching and change batching.
//!
//! This module is responsible for:
//! - Deciding which paths belong to excluded subtrees ([`filter`]).
//! - Turning raw `notify` events into [`ChangeEvent`]s for compilable
//!   sources ([`event`], [`watcher`]).
//! - Coalescing bursts of events into one [`ChangeBatch`] per quiet period
//!   ([`debouncer`]).
//!
//! It does **not** know about output files or the compiler; it only hands
//! finished batches to whoever owns the receiving end of the batch channel.

pub mod debouncer;
pub mod event;
pub mod filter;
pub mod path_utils;
pub mod watcher;

pub use debouncer::{spawn_debouncer, DebouncerExit};
pub use event::{ChangeBatch, ChangeEvent, ChangeKind, WatchMessage};
pub use filter::PathFilter;
pub use watcher::{spawn_watcher, SourceMatcher, WatcherHandle};
