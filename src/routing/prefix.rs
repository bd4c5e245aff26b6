// src/routing/prefix.rs

use std::fmt;

use crate::errors::{DevReloadError, Result};

/// Path namespace owned by the dev proxy, e.g. `/ts`.
///
/// Compared case-insensitively and on segment boundaries: `/ts` covers `/ts`
/// and `/ts/app.js` but not `/tsconfig.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReservedPrefix {
    prefix: String,
}

impl ReservedPrefix {
    pub fn new(prefix: &str) -> Result<Self> {
        let trimmed = prefix.trim().trim_end_matches('/');
        if !trimmed.starts_with('/') {
            return Err(DevReloadError::ConfigError(format!(
                "reserved prefix '{prefix}' must start with '/'"
            )));
        }
        Ok(Self {
            prefix: trimmed.to_ascii_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Whether `path` falls under the prefix once normalized with
    /// [`normalize_path`].
    pub fn contains(&self, path: &str) -> bool {
        let normalized = normalize_path(path).to_ascii_lowercase();
        match normalized.strip_prefix(&self.prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Lexical form of a request path: query and fragment dropped, backslashes
/// read as `/`, empty and `.` segments removed, `..` applied without
/// climbing above the root. Always starts with `/`.
///
/// `//ts/app.js`, `/./ts/app.js` and `/css/../ts/app.js` all become
/// `/ts/app.js`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

impl fmt::Display for ReservedPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}
