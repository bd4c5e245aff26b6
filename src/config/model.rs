// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::{deserialize_duration, CompileStrategy};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [supervisor]
/// strategy = "batch"
/// quiet_period = "500ms"
///
/// [compiler]
/// program = "scripts/node_modules/.bin/esbuild"
/// source_dir = "scripts"
/// output_dir = "wwwroot/ts"
///
/// [dev_server]
/// program = "npm"
/// args = ["run", "dev"]
///
/// [routing]
/// reserved_prefix = "/ts"
///
/// [reverse_proxy.clusters.vite.destinations.d1]
/// Address = "http://localhost:5173/"
/// ```
///
/// All sections are optional and have reasonable defaults. Unknown sections
/// are kept in the raw tree and searched for the dev-proxy address.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub supervisor: SupervisorSection,

    #[serde(default)]
    pub compiler: CompilerSection,

    #[serde(default)]
    pub dev_server: DevServerSection,

    #[serde(default)]
    pub routing: RoutingSection,

    /// The whole document, used for the depth-first address search.
    #[serde(skip)]
    pub tree: toml::Table,

    /// Directory the config file was loaded from; relative paths hang off it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
    /// Project root, relative to the config file's directory.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    #[serde(default)]
    pub strategy: CompileStrategy,

    /// Quiet period a burst of events must be followed by before a batch is
    /// handed to the compiler.
    #[serde(
        default = "default_quiet_period",
        deserialize_with = "deserialize_duration"
    )]
    pub quiet_period: Duration,

    /// Upper bound for the whole shutdown sequence.
    #[serde(
        default = "default_shutdown_grace",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_grace: Duration,

    /// Directory name that never triggers recompilation, at any depth.
    #[serde(default = "default_excluded_dir")]
    pub excluded_dir: String,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_quiet_period() -> Duration {
    Duration::from_millis(500)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(3)
}

fn default_excluded_dir() -> String {
    "node_modules".to_string()
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            strategy: CompileStrategy::default(),
            quiet_period: default_quiet_period(),
            shutdown_grace: default_shutdown_grace(),
            excluded_dir: default_excluded_dir(),
        }
    }
}

/// `[compiler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Compiler executable: either a bare name looked up on `PATH` or a path
    /// relative to the project root.
    #[serde(default = "default_compiler_program")]
    pub program: String,

    /// Watched source tree, relative to the project root.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Glob (relative to `source_dir`) selecting compilable sources.
    #[serde(default = "default_source_glob")]
    pub source_glob: String,

    /// Output directory, relative to the project root.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Extension given to generated outputs (without the dot).
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    #[serde(default = "default_outdir_flag")]
    pub outdir_flag: String,

    /// Flag putting the compiler into its own watch mode (persistent strategy).
    #[serde(default = "default_watch_flag")]
    pub watch_flag: String,

    /// Arguments placed before everything else on the compiler command line.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_compiler_program() -> String {
    "scripts/node_modules/.bin/esbuild".to_string()
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_source_glob() -> String {
    "**/*.ts".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("wwwroot/ts")
}

fn default_output_extension() -> String {
    "js".to_string()
}

fn default_outdir_flag() -> String {
    "--outdir".to_string()
}

fn default_watch_flag() -> String {
    "--watch".to_string()
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_compiler_program(),
            source_dir: default_source_dir(),
            source_glob: default_source_glob(),
            output_dir: default_output_dir(),
            output_extension: default_output_extension(),
            outdir_flag: default_outdir_flag(),
            watch_flag: default_watch_flag(),
            extra_args: Vec::new(),
        }
    }
}

/// `[dev_server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DevServerSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tool used to start the dev server, resolved on `PATH`.
    #[serde(default = "default_dev_program")]
    pub program: String,

    #[serde(default = "default_dev_args")]
    pub args: Vec<String>,

    /// Directory holding the dev server's package metadata, relative to the
    /// project root.
    #[serde(default = "default_dev_working_dir")]
    pub working_dir: PathBuf,

    /// Package metadata file that must exist inside `working_dir`.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Installed-dependencies directory that must exist inside `working_dir`.
    #[serde(default = "default_dependencies_dir")]
    pub dependencies_dir: String,

    /// Leaf key holding the dev-proxy URI somewhere in the config tree.
    #[serde(default = "default_address_key")]
    pub address_key: String,

    #[serde(
        default = "default_probe_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub probe_timeout: Duration,

    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub poll_interval: Duration,

    #[serde(
        default = "default_launch_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub launch_timeout: Duration,

    /// Kill the dev server when the supervisor drops its handle.
    #[serde(default = "default_true")]
    pub terminate_on_exit: bool,
}

fn default_dev_program() -> String {
    "npm".to_string()
}

fn default_dev_args() -> Vec<String> {
    vec!["run".to_string(), "dev".to_string()]
}

fn default_dev_working_dir() -> PathBuf {
    PathBuf::from("BrowserScripts")
}

fn default_manifest() -> String {
    "package.json".to_string()
}

fn default_dependencies_dir() -> String {
    "node_modules".to_string()
}

fn default_address_key() -> String {
    "Address".to_string()
}

fn default_probe_timeout() -> Duration {
    Duration::from_millis(250)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(200)
}

fn default_launch_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for DevServerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_dev_program(),
            args: default_dev_args(),
            working_dir: default_dev_working_dir(),
            manifest: default_manifest(),
            dependencies_dir: default_dependencies_dir(),
            address_key: default_address_key(),
            probe_timeout: default_probe_timeout(),
            poll_interval: default_poll_interval(),
            launch_timeout: default_launch_timeout(),
            terminate_on_exit: true,
        }
    }
}

/// `[routing]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSection {
    /// Static file root, relative to the project root.
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,

    /// Path namespace owned by the dev proxy while it is live.
    #[serde(default = "default_reserved_prefix")]
    pub reserved_prefix: String,
}

fn default_static_root() -> PathBuf {
    PathBuf::from("wwwroot")
}

fn default_reserved_prefix() -> String {
    "/ts".to_string()
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            static_root: default_static_root(),
            reserved_prefix: default_reserved_prefix(),
        }
    }
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders can rely on durations being non-zero, the source glob
/// compiling, and the reserved prefix being well-formed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub supervisor: SupervisorSection,
    pub compiler: CompilerSection,
    pub dev_server: DevServerSection,
    pub routing: RoutingSection,
    tree: toml::Value,
    project_root: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        let project_root = raw.base_dir.join(&raw.supervisor.project_root);
        Self {
            supervisor: raw.supervisor,
            compiler: raw.compiler,
            dev_server: raw.dev_server,
            routing: raw.routing,
            tree: toml::Value::Table(raw.tree),
            project_root,
        }
    }

    /// The raw document as a generic tree.
    pub fn tree(&self) -> &toml::Value {
        &self.tree
    }

    /// Absolute (or config-relative) project root.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn source_root(&self) -> PathBuf {
        self.project_root.join(&self.compiler.source_dir)
    }

    pub fn output_root(&self) -> PathBuf {
        self.project_root.join(&self.compiler.output_dir)
    }

    pub fn static_root(&self) -> PathBuf {
        self.project_root.join(&self.routing.static_root)
    }

    pub fn dev_server_dir(&self) -> PathBuf {
        self.project_root.join(&self.dev_server.working_dir)
    }
}
