// src/config/validate.rs

use std::time::Duration;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DevReloadError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DevReloadError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_supervisor(cfg)?;
    validate_compiler(cfg)?;
    validate_dev_server(cfg)?;
    validate_routing(cfg)?;
    Ok(())
}

fn non_zero(name: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(DevReloadError::ConfigError(format!(
            "{name} must be greater than zero"
        )));
    }
    Ok(())
}

fn validate_supervisor(cfg: &RawConfigFile) -> Result<()> {
    non_zero("[supervisor].quiet_period", cfg.supervisor.quiet_period)?;

    let excluded = cfg.supervisor.excluded_dir.trim();
    if excluded.is_empty() || excluded.contains(['/', '\\']) {
        return Err(DevReloadError::ConfigError(format!(
            "[supervisor].excluded_dir must be a single directory name (got '{}')",
            cfg.supervisor.excluded_dir
        )));
    }
    Ok(())
}

fn validate_compiler(cfg: &RawConfigFile) -> Result<()> {
    let compiler = &cfg.compiler;
    if compiler.program.trim().is_empty() {
        return Err(DevReloadError::ConfigError(
            "[compiler].program must not be empty".to_string(),
        ));
    }
    if compiler.output_extension.trim().is_empty() {
        return Err(DevReloadError::ConfigError(
            "[compiler].output_extension must not be empty".to_string(),
        ));
    }
    if compiler.source_glob.trim().is_empty() {
        return Err(DevReloadError::ConfigError(
            "[compiler].source_glob must not be empty".to_string(),
        ));
    }
    Glob::new(&compiler.source_glob).map_err(|e| {
        DevReloadError::ConfigError(format!(
            "[compiler].source_glob '{}' is invalid: {e}",
            compiler.source_glob
        ))
    })?;
    Ok(())
}

fn validate_dev_server(cfg: &RawConfigFile) -> Result<()> {
    let dev = &cfg.dev_server;
    non_zero("[dev_server].probe_timeout", dev.probe_timeout)?;
    non_zero("[dev_server].poll_interval", dev.poll_interval)?;
    non_zero("[dev_server].launch_timeout", dev.launch_timeout)?;
    if dev.address_key.trim().is_empty() {
        return Err(DevReloadError::ConfigError(
            "[dev_server].address_key must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_routing(cfg: &RawConfigFile) -> Result<()> {
    let prefix = cfg.routing.reserved_prefix.trim_end_matches('/');
    if !cfg.routing.reserved_prefix.starts_with('/') || prefix.is_empty() {
        return Err(DevReloadError::ConfigError(format!(
            "[routing].reserved_prefix must start with '/' and name a subtree (got '{}')",
            cfg.routing.reserved_prefix
        )));
    }
    Ok(())
}
