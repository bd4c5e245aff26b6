// src/supervisor.rs

//! Wires the compile half and the proxy half together for one run.
//!
//! The two halves fail independently: a missing compiler disables
//! compilation, a missing dev server disables forwarding, and neither ever
//! returns an error to the host.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::compile::{
    locate_compiler, spawn_compile_worker, BatchCompiler, OutputMapper, PersistentCompiler,
    PersistentSpec, ProcessCompiler,
};
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::fs::{FileSystem, FsStaticStorage, RealFileSystem, StaticStorage};
use crate::proxy::{
    DevProxyLauncher, DevServerHandle, DisabledReason, LaunchSettings, LivenessProbe,
    ProcessSpawner, ProxyState, ProxyTarget, TcpProbe, TokioSpawner,
};
use crate::routing::{ReservedPrefix, RoutingMask};
use crate::types::CompileStrategy;
use crate::watch::{
    spawn_debouncer, spawn_watcher, ChangeBatch, DebouncerExit, PathFilter, SourceMatcher,
    WatchMessage, WatcherHandle,
};

/// Capacity of the raw event channel between the watcher and the debouncer.
const WATCH_CHANNEL_CAPACITY: usize = 1024;

/// What the compile half is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileStatus {
    /// Compilation switched off (configuration) or stopped (shutdown).
    Off,
    /// Batch mode: watching sources and compiling each quiet-period batch.
    Watching,
    /// Persistent mode: the compiler's own watch mode is running.
    Persistent,
    /// Failed for this run.
    Disabled(CompileDisabled),
}

/// Why the compile half stopped working for this run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileDisabled {
    #[error("{0}")]
    Toolchain(String),

    #[error("invalid source pattern: {0}")]
    SourcePattern(String),

    #[error("cannot watch {path:?}: {reason}")]
    WatchUnavailable { path: PathBuf, reason: String },

    #[error("file watching failed: {0}")]
    WatchFailed(String),

    #[error("compile worker stopped")]
    WorkerStopped,

    #[error("watch-mode compiler could not start: {0}")]
    StartFailed(String),

    #[error("watch-mode compiler exited")]
    CompilerExited,
}

/// Per-run overrides on top of the configuration file.
#[derive(Debug, Clone, Default)]
pub struct SupervisorOptions {
    pub strategy: Option<CompileStrategy>,
    /// Set to skip the dev server regardless of configuration.
    pub no_dev_server: bool,
}

enum CompileHalf {
    Off,
    Batch {
        watcher: WatcherHandle,
        monitor: JoinHandle<()>,
        worker: JoinHandle<()>,
    },
    Persistent(PersistentCompiler),
}

/// A running hot-reload supervisor.
pub struct Supervisor {
    config: ConfigFile,
    proxy_state: watch::Receiver<ProxyState>,
    proxy_target: Option<ProxyTarget>,
    proxy_reason: Option<DisabledReason>,
    dev_server: Option<DevServerHandle>,
    compile_status: watch::Sender<CompileStatus>,
    compile: CompileHalf,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("proxy_state", &*self.proxy_state.borrow())
            .field("proxy_target", &self.proxy_target)
            .field("compile_status", &*self.compile_status.borrow())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Start both halves with the real probe and process spawner.
    pub async fn start(config: ConfigFile, options: SupervisorOptions) -> Self {
        let probe = TcpProbe::new(config.dev_server.probe_timeout);
        Self::start_with(config, options, probe, TokioSpawner).await
    }

    /// Start both halves, probing and spawning the dev server through the
    /// given implementations.
    ///
    /// Returns once the compile half is running and the proxy has reached
    /// `Ready` or `Disabled`.
    pub async fn start_with<P, S>(config: ConfigFile, options: SupervisorOptions, probe: P, spawner: S) -> Self
    where
        P: LivenessProbe,
        S: ProcessSpawner,
    {
        let (compile_tx, _) = watch::channel(CompileStatus::Off);
        let strategy = options.strategy.unwrap_or(config.supervisor.strategy);
        let compile = start_compile_half(&config, strategy, &compile_tx);

        let (state_tx, proxy_state) = watch::channel(ProxyState::Unknown);
        let mut settings = LaunchSettings::from_config(&config);
        if options.no_dev_server {
            settings.enabled = false;
        }
        let launcher = DevProxyLauncher::new(settings, probe, spawner, state_tx);
        let outcome = launcher.establish(config.tree()).await;

        info!(
            proxy = ?outcome.state,
            target = ?outcome.target.as_ref().map(ToString::to_string),
            compile = ?compile_tx.borrow().clone(),
            "supervisor started"
        );

        Self {
            config,
            proxy_state,
            proxy_target: outcome.target,
            proxy_reason: outcome.reason,
            dev_server: outcome.process,
            compile_status: compile_tx,
            compile,
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn proxy_state(&self) -> ProxyState {
        *self.proxy_state.borrow()
    }

    pub fn proxy_target(&self) -> Option<&ProxyTarget> {
        self.proxy_target.as_ref()
    }

    pub fn proxy_disabled_reason(&self) -> Option<&DisabledReason> {
        self.proxy_reason.as_ref()
    }

    /// Whether this run launched the dev server (as opposed to finding one
    /// already listening).
    pub fn owns_dev_server(&self) -> bool {
        self.dev_server.is_some()
    }

    pub fn compile_status(&self) -> CompileStatus {
        if let CompileHalf::Persistent(compiler) = &self.compile {
            if !compiler.is_running() {
                return CompileStatus::Disabled(CompileDisabled::CompilerExited);
            }
        }
        self.compile_status.borrow().clone()
    }

    /// Observe compile status changes.
    pub fn subscribe_compile_status(&self) -> watch::Receiver<CompileStatus> {
        self.compile_status.subscribe()
    }

    /// Static storage over the configured static root, hiding the excluded
    /// directory.
    pub fn static_storage(&self) -> FsStaticStorage {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        FsStaticStorage::new(self.config.static_root(), fs)
            .with_filter(PathFilter::new(&self.config.supervisor.excluded_dir))
    }

    /// Wrap `storage` in the knockout filter driven by this run's proxy
    /// state.
    pub fn routing_mask<St: StaticStorage>(&self, storage: St) -> Result<RoutingMask<St>> {
        let prefix = ReservedPrefix::new(&self.config.routing.reserved_prefix)?;
        Ok(RoutingMask::new(
            storage,
            prefix,
            self.proxy_state.clone(),
            self.proxy_target.clone(),
        ))
    }

    /// Stop the watcher, let in-flight work finish, close the persistent
    /// compiler's input and release the dev server, all within
    /// `shutdown_grace`. Anything still running at the deadline is aborted.
    pub async fn shutdown(mut self) {
        let grace = self.config.supervisor.shutdown_grace;
        let compile = std::mem::replace(&mut self.compile, CompileHalf::Off);

        let mut aborts: Vec<AbortHandle> = Vec::new();
        let stopping = async {
            match compile {
                CompileHalf::Off => {}
                CompileHalf::Batch {
                    watcher,
                    monitor,
                    worker,
                } => {
                    aborts.push(monitor.abort_handle());
                    aborts.push(worker.abort_handle());
                    // Dropping the watcher closes the event channel, which
                    // ends the debouncer and then the worker.
                    watcher.stop();
                    let _ = monitor.await;
                    let _ = worker.await;
                }
                CompileHalf::Persistent(compiler) => {
                    aborts.push(compiler.abort_handle());
                    if let Some(exit) = compiler.shutdown().await {
                        debug!(?exit, "watch-mode compiler finished");
                    }
                }
            }
        };

        let timed_out = timeout(grace, stopping).await.is_err();
        if timed_out {
            warn!(?grace, "shutdown grace period elapsed; aborting remaining work");
            for handle in &aborts {
                handle.abort();
            }
        }
        self.compile_status.send_replace(CompileStatus::Off);

        if let Some(handle) = self.dev_server.take() {
            info!(pid = ?handle.id(), "releasing dev server");
            drop(handle);
        }
        info!("supervisor stopped");
    }
}

fn start_compile_half(
    config: &ConfigFile,
    strategy: CompileStrategy,
    status: &watch::Sender<CompileStatus>,
) -> CompileHalf {
    if !config.compiler.enabled {
        info!("compilation disabled by configuration");
        return CompileHalf::Off;
    }

    let project_root = canonical_or_given(config.project_root());
    let program = match locate_compiler(&config.compiler.program, &project_root) {
        Ok(program) => program,
        Err(e) => return disable(status, CompileDisabled::Toolchain(e.to_string())),
    };

    match strategy {
        CompileStrategy::Batch => start_batch(config, &project_root, program, status),
        CompileStrategy::Persistent => start_persistent(config, &project_root, program, status),
    }
}

fn start_batch(
    config: &ConfigFile,
    project_root: &Path,
    program: PathBuf,
    status: &watch::Sender<CompileStatus>,
) -> CompileHalf {
    let compiler_cfg = &config.compiler;

    // Watcher events and the output mapper must agree on the path form.
    let source_root = canonical_or_given(&project_root.join(&compiler_cfg.source_dir));
    let output_root = project_root.join(&compiler_cfg.output_dir);

    let matcher = match SourceMatcher::new(&source_root, &compiler_cfg.source_glob) {
        Ok(matcher) => matcher,
        Err(e) => return disable(status, CompileDisabled::SourcePattern(e.to_string())),
    };

    let (event_tx, event_rx) = mpsc::channel::<WatchMessage>(WATCH_CHANNEL_CAPACITY);
    let watcher = match spawn_watcher(matcher, event_tx) {
        Ok(watcher) => watcher,
        Err(e) => {
            return disable(
                status,
                CompileDisabled::WatchUnavailable {
                    path: source_root,
                    reason: e.to_string(),
                },
            );
        }
    };

    let (batch_tx, batch_rx) = mpsc::unbounded_channel::<ChangeBatch>();
    let debouncer = spawn_debouncer(
        config.supervisor.quiet_period,
        PathFilter::new(&config.supervisor.excluded_dir).relative_to(&source_root),
        event_rx,
        batch_tx,
    );

    let backend = ProcessCompiler::new(
        program,
        compiler_cfg.extra_args.clone(),
        compiler_cfg.outdir_flag.clone(),
    );
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let compiler = BatchCompiler::new(backend, fs, project_root, &compiler_cfg.output_dir);
    let mapper = OutputMapper::new(&source_root, &output_root, &compiler_cfg.output_extension);
    let worker = spawn_compile_worker(compiler, mapper, batch_rx);

    let monitor_status = status.clone();
    let monitor = tokio::spawn(async move {
        match debouncer.await {
            Ok(DebouncerExit::ChannelClosed) => debug!("debouncer stopped"),
            Ok(DebouncerExit::WatchFailed(reason)) => {
                monitor_status.send_replace(CompileStatus::Disabled(CompileDisabled::WatchFailed(reason)));
            }
            Ok(DebouncerExit::CompilerGone) => {
                error!("compile worker stopped unexpectedly; compilation disabled");
                monitor_status.send_replace(CompileStatus::Disabled(CompileDisabled::WorkerStopped));
            }
            Err(e) => {
                error!(error = %e, "debouncer task failed");
                monitor_status.send_replace(CompileStatus::Disabled(CompileDisabled::WorkerStopped));
            }
        }
    });

    status.send_replace(CompileStatus::Watching);
    info!(?source_root, ?output_root, "batch compilation active");

    CompileHalf::Batch {
        watcher,
        monitor,
        worker,
    }
}

fn start_persistent(
    config: &ConfigFile,
    project_root: &Path,
    program: PathBuf,
    status: &watch::Sender<CompileStatus>,
) -> CompileHalf {
    let compiler_cfg = &config.compiler;
    let glob = compiler_cfg
        .source_dir
        .join(&compiler_cfg.source_glob)
        .to_string_lossy()
        .into_owned();

    let spec = PersistentSpec {
        program,
        extra_args: compiler_cfg.extra_args.clone(),
        glob,
        watch_flag: compiler_cfg.watch_flag.clone(),
        outdir_flag: compiler_cfg.outdir_flag.clone(),
        output_dir: compiler_cfg.output_dir.clone(),
        working_dir: project_root.to_path_buf(),
    };

    // Half the grace goes to the polite stdin close, leaving room to kill.
    let stdin_grace = config.supervisor.shutdown_grace / 2;
    match PersistentCompiler::start(&spec, stdin_grace) {
        Ok(compiler) => {
            status.send_replace(CompileStatus::Persistent);
            CompileHalf::Persistent(compiler)
        }
        Err(e) => disable(status, CompileDisabled::StartFailed(format!("{e:#}"))),
    }
}

fn disable(status: &watch::Sender<CompileStatus>, reason: CompileDisabled) -> CompileHalf {
    warn!(%reason, "compilation disabled for this run");
    status.send_replace(CompileStatus::Disabled(reason));
    CompileHalf::Off
}

fn canonical_or_given(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
