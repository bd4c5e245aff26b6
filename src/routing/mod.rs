// src/routing/mod.rs

//! Request-time split between the dev proxy and local static storage.
//!
//! While the proxy is `Ready` the reserved prefix belongs to it alone:
//! forwarded, and hidden from both lookup and listing of the local store.
//! In every other state the local store serves everything.

pub mod mask;
pub mod prefix;

pub use mask::{claims, RoutingDecision, RoutingMask};
pub use prefix::{normalize_path, ReservedPrefix};
