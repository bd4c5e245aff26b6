// src/proxy/address.rs

//! Finding the dev-proxy address in a nested configuration tree.

use std::fmt;

use url::{Host, Url};

use crate::errors::{DevReloadError, Result};

/// Minimal view of a tree-shaped configuration value.
///
/// Tables yield named children, arrays yield unnamed ones, strings are
/// leaves. Anything else is neither.
pub trait ConfigTree {
    fn as_leaf(&self) -> Option<&str>;
    fn entries(&self) -> Vec<(Option<&str>, &Self)>;
}

impl ConfigTree for toml::Value {
    fn as_leaf(&self) -> Option<&str> {
        self.as_str()
    }

    fn entries(&self) -> Vec<(Option<&str>, &Self)> {
        match self {
            toml::Value::Table(table) => table.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
            toml::Value::Array(items) => items.iter().map(|v| (None, v)).collect(),
            _ => Vec::new(),
        }
    }
}

/// Depth-first search for the first leaf named `key` (ASCII
/// case-insensitive). A node's own children are checked in order, and each
/// child is searched fully before its next sibling.
pub fn find_leaf<'a, T: ConfigTree + ?Sized>(node: &'a T, key: &str) -> Option<&'a str> {
    for (name, child) in node.entries() {
        if name.is_some_and(|n| n.eq_ignore_ascii_case(key)) {
            if let Some(value) = child.as_leaf() {
                return Some(value);
            }
        }
        if let Some(found) = find_leaf(child, key) {
            return Some(found);
        }
    }
    None
}

/// Where the dev proxy listens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyTarget {
    pub host: String,
    pub port: u16,
    base: Url,
}

impl ProxyTarget {
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: String| DevReloadError::InvalidProxyAddress {
            value: value.to_string(),
            reason,
        };

        let base = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
        let host = match base.host() {
            Some(Host::Domain(d)) => d.to_string(),
            Some(Host::Ipv4(a)) => a.to_string(),
            Some(Host::Ipv6(a)) => a.to_string(),
            None => return Err(invalid("missing host".to_string())),
        };
        let port = base
            .port_or_known_default()
            .ok_or_else(|| invalid(format!("no port and no default port for scheme '{}'", base.scheme())))?;

        Ok(Self { host, port, base })
    }

    /// The configured URI.
    pub fn url(&self) -> &Url {
        &self.base
    }
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Resolve the dev-proxy target from the configuration tree.
pub fn resolve_proxy_target<T: ConfigTree + ?Sized>(tree: &T, key: &str) -> Result<ProxyTarget> {
    let value = find_leaf(tree, key).ok_or_else(|| DevReloadError::MissingProxyAddress {
        key: key.to_string(),
    })?;
    ProxyTarget::parse(value)
}
