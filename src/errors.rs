// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevReloadError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("no `{key}` entry found in any configuration section")]
    MissingProxyAddress { key: String },

    #[error("invalid dev-proxy address '{value}': {reason}")]
    InvalidProxyAddress { value: String, reason: String },

    #[error("Toolchain missing: {0}")]
    ToolchainMissing(String),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevReloadError>;
