#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use devreload::config::{ConfigFile, RawConfigFile};
use devreload::errors::Result;
use devreload::types::CompileStrategy;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the same defaults a config file with no sections gets, rooted
/// at `base_dir`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            config: RawConfigFile {
                base_dir: base_dir.as_ref().to_path_buf(),
                ..RawConfigFile::default()
            },
        }
    }

    pub fn strategy(mut self, strategy: CompileStrategy) -> Self {
        self.config.supervisor.strategy = strategy;
        self
    }

    pub fn quiet_period(mut self, period: Duration) -> Self {
        self.config.supervisor.quiet_period = period;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.supervisor.shutdown_grace = grace;
        self
    }

    pub fn excluded_dir(mut self, name: &str) -> Self {
        self.config.supervisor.excluded_dir = name.to_string();
        self
    }

    pub fn compiler_program(mut self, program: &str) -> Self {
        self.config.compiler.program = program.to_string();
        self
    }

    pub fn compiler_args(mut self, args: &[&str]) -> Self {
        self.config.compiler.extra_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn without_compiler(mut self) -> Self {
        self.config.compiler.enabled = false;
        self
    }

    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.compiler.source_dir = dir.into();
        self
    }

    pub fn source_glob(mut self, glob: &str) -> Self {
        self.config.compiler.source_glob = glob.to_string();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.compiler.output_dir = dir.into();
        self
    }

    pub fn output_extension(mut self, ext: &str) -> Self {
        self.config.compiler.output_extension = ext.to_string();
        self
    }

    pub fn without_dev_server(mut self) -> Self {
        self.config.dev_server.enabled = false;
        self
    }

    pub fn dev_server_program(mut self, program: &str, args: &[&str]) -> Self {
        self.config.dev_server.program = program.to_string();
        self.config.dev_server.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn dev_server_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dev_server.working_dir = dir.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.dev_server.poll_interval = interval;
        self
    }

    pub fn launch_timeout(mut self, timeout: Duration) -> Self {
        self.config.dev_server.launch_timeout = timeout;
        self
    }

    pub fn static_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.routing.static_root = dir.into();
        self
    }

    pub fn reserved_prefix(mut self, prefix: &str) -> Self {
        self.config.routing.reserved_prefix = prefix.to_string();
        self
    }

    /// Put an `Address` leaf where a reverse-proxy section would hold it:
    /// `reverse_proxy.clusters.dev.destinations.d1.Address`.
    pub fn proxy_address(mut self, address: &str) -> Self {
        let mut leaf = toml::Table::new();
        leaf.insert("Address".to_string(), toml::Value::String(address.to_string()));

        let mut node = toml::Value::Table(leaf);
        for key in ["d1", "destinations", "dev", "clusters"] {
            let mut parent = toml::Table::new();
            parent.insert(key.to_string(), node);
            node = toml::Value::Table(parent);
        }
        self.config.tree.insert("reverse_proxy".to_string(), node);
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}
