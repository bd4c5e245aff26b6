// src/routing/mask.rs

use tokio::sync::watch;
use tracing::{debug, trace};
use url::Url;

use crate::fs::{StaticEntry, StaticStorage};
use crate::proxy::{ProxyState, ProxyTarget};
use crate::routing::prefix::{normalize_path, ReservedPrefix};

/// Where one request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    ForwardToProxy,
    ServeLocal,
    NotFound,
}

/// Whether the proxy owns `path` in `state`.
pub fn claims(prefix: &ReservedPrefix, path: &str, state: ProxyState) -> bool {
    state == ProxyState::Ready && prefix.contains(path)
}

/// Knockout decorator over a [`StaticStorage`].
///
/// Every call reads one snapshot of the proxy state, so a lookup and the
/// routing decision made from the same snapshot always agree.
#[derive(Debug, Clone)]
pub struct RoutingMask<S> {
    inner: S,
    prefix: ReservedPrefix,
    state: watch::Receiver<ProxyState>,
    target: Option<ProxyTarget>,
}

impl<S: StaticStorage> RoutingMask<S> {
    pub fn new(
        inner: S,
        prefix: ReservedPrefix,
        state: watch::Receiver<ProxyState>,
        target: Option<ProxyTarget>,
    ) -> Self {
        Self {
            inner,
            prefix,
            state,
            target,
        }
    }

    pub fn prefix(&self) -> &ReservedPrefix {
        &self.prefix
    }

    pub fn state(&self) -> ProxyState {
        *self.state.borrow()
    }

    /// The reverse-proxy forwarder is switched on as a whole only while the
    /// proxy is ready.
    pub fn forwarding_enabled(&self) -> bool {
        self.state() == ProxyState::Ready && self.target.is_some()
    }

    fn owns(&self, path: &str, state: ProxyState) -> bool {
        self.target.is_some() && claims(&self.prefix, path, state)
    }

    /// Inner lookup, dropping anything that resolves into the claimed
    /// subtree under a spelling the prefix check did not catch.
    fn local(&self, path: &str, state: ProxyState) -> Option<StaticEntry> {
        self.inner
            .lookup(path)
            .filter(|entry| !self.owns(&entry.path, state))
    }

    pub fn route(&self, path: &str) -> RoutingDecision {
        let state = self.state();
        let decision = if self.owns(path, state) {
            RoutingDecision::ForwardToProxy
        } else if self.local(path, state).is_some() {
            RoutingDecision::ServeLocal
        } else {
            RoutingDecision::NotFound
        };
        trace!(path, ?decision, "routed");
        decision
    }

    /// Upstream URL for a request the proxy owns; `None` for everything the
    /// local store handles.
    pub fn forward_url(&self, path: &str) -> Option<Url> {
        if !self.owns(path, self.state()) {
            return None;
        }
        let target = self.target.as_ref()?;

        let path = path.split('#').next().unwrap_or_default();
        let (path_part, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };

        let mut url = target.url().clone();
        url.set_path(&normalize_path(path_part));
        url.set_query(query);
        url.set_fragment(None);
        debug!(path, %url, "forwarding to dev proxy");
        Some(url)
    }
}

impl<S: StaticStorage> StaticStorage for RoutingMask<S> {
    fn lookup(&self, path: &str) -> Option<StaticEntry> {
        let state = self.state();
        if self.owns(path, state) {
            return None;
        }
        self.local(path, state)
    }

    fn list(&self, dir: &str) -> Vec<StaticEntry> {
        if self.target.is_none() {
            return self.inner.list(dir);
        }
        let state = self.state();
        if claims(&self.prefix, dir, state) {
            return Vec::new();
        }
        self.inner
            .list(dir)
            .into_iter()
            .filter(|entry| !claims(&self.prefix, &entry.path, state))
            .collect()
    }
}
