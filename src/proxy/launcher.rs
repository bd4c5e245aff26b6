// src/proxy/launcher.rs

//! Dev-proxy state machine.
//!
//! ```text
//! Unknown ──(no/invalid address)──────────────────────────▶ Disabled
//! Unknown ──▶ ProbingExisting ──(connect ok)──────────────▶ Ready
//!                   │
//!                   └──(refused)──▶ Launching ──(probe ok)─▶ Ready
//!                                      │
//!                                      └──(tool/deps missing, spawn error,
//!                                          child exited, timeout)──▶ Disabled
//! ```
//!
//! `Ready` and `Disabled` are terminal for one supervisor run. Probing an
//! existing listener first keeps host restarts from spawning a second dev
//! server; it is the only mutual exclusion between supervisor instances.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::proxy::address::{resolve_proxy_target, ConfigTree, ProxyTarget};
use crate::proxy::probe::LivenessProbe;
use crate::proxy::process::{ChildExit, DevServerCommand, DevServerHandle, ProcessSpawner};
use crate::toolchain::locate_program;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyState {
    Unknown,
    ProbingExisting,
    Launching,
    Ready,
    Disabled,
}

/// Why the dev proxy ended up `Disabled`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisabledReason {
    #[error("dev server disabled by configuration")]
    NotEnabled,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("dev server tool unavailable: {0}")]
    ToolNotFound(String),

    #[error("package metadata {0:?} not found")]
    ManifestMissing(PathBuf),

    #[error("dependencies not installed ({0:?} missing); run the package install first")]
    DependenciesMissing(PathBuf),

    #[error("failed to spawn dev server: {0}")]
    SpawnFailed(String),

    #[error("dev server exited ({0}) before accepting connections")]
    ExitedEarly(ChildExit),

    #[error("dev server did not accept connections within {0:?}")]
    Timeout(Duration),
}

/// Launcher knobs, usually taken from `[dev_server]`.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub manifest: String,
    pub dependencies_dir: String,
    pub address_key: String,
    pub poll_interval: Duration,
    pub launch_timeout: Duration,
    pub terminate_on_exit: bool,
}

impl LaunchSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let dev = &cfg.dev_server;
        Self {
            enabled: dev.enabled,
            program: dev.program.clone(),
            args: dev.args.clone(),
            working_dir: cfg.dev_server_dir(),
            manifest: dev.manifest.clone(),
            dependencies_dir: dev.dependencies_dir.clone(),
            address_key: dev.address_key.clone(),
            poll_interval: dev.poll_interval,
            launch_timeout: dev.launch_timeout,
            terminate_on_exit: dev.terminate_on_exit,
        }
    }
}

/// Final result of [`DevProxyLauncher::establish`].
#[derive(Debug)]
pub struct ProxyOutcome {
    /// `Ready` or `Disabled`.
    pub state: ProxyState,
    pub target: Option<ProxyTarget>,
    pub reason: Option<DisabledReason>,
    /// Present only when this launcher spawned the dev server and it became
    /// ready.
    pub process: Option<DevServerHandle>,
}

pub struct DevProxyLauncher<P: LivenessProbe, S: ProcessSpawner> {
    settings: LaunchSettings,
    probe: P,
    spawner: S,
    state: watch::Sender<ProxyState>,
}

impl<P: LivenessProbe, S: ProcessSpawner> std::fmt::Debug for DevProxyLauncher<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevProxyLauncher")
            .field("settings", &self.settings)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<P: LivenessProbe, S: ProcessSpawner> DevProxyLauncher<P, S> {
    pub fn new(settings: LaunchSettings, probe: P, spawner: S, state: watch::Sender<ProxyState>) -> Self {
        Self {
            settings,
            probe,
            spawner,
            state,
        }
    }

    pub fn state(&self) -> ProxyState {
        *self.state.borrow()
    }

    /// Drive the state machine to `Ready` or `Disabled`.
    ///
    /// Blocks until a terminal state is reached; call during startup only.
    pub async fn establish<T: ConfigTree + Sync + ?Sized>(&self, tree: &T) -> ProxyOutcome {
        if !self.settings.enabled {
            return self.disabled(None, DisabledReason::NotEnabled);
        }

        let target = match resolve_proxy_target(tree, &self.settings.address_key) {
            Ok(target) => target,
            Err(e) => return self.disabled(None, DisabledReason::Configuration(e.to_string())),
        };

        self.transition(ProxyState::ProbingExisting);
        if self.probe.probe(&target).await {
            info!(%target, "dev server already listening; not launching another");
            self.transition(ProxyState::Ready);
            return ProxyOutcome {
                state: ProxyState::Ready,
                target: Some(target),
                reason: None,
                process: None,
            };
        }

        self.transition(ProxyState::Launching);
        let command = match self.check_toolchain() {
            Ok(command) => command,
            Err(reason) => return self.disabled(Some(target), reason),
        };

        let child = match self.spawner.spawn(&command) {
            Ok(child) => child,
            Err(e) => return self.disabled(Some(target), DisabledReason::SpawnFailed(format!("{e:#}"))),
        };
        let mut handle = DevServerHandle::new(child);

        match self.wait_until_ready(&target, &mut handle).await {
            Ok(()) => {
                info!(%target, pid = ?handle.id(), "dev server is accepting connections");
                self.transition(ProxyState::Ready);
                ProxyOutcome {
                    state: ProxyState::Ready,
                    target: Some(target),
                    reason: None,
                    process: Some(handle),
                }
            }
            Err(reason) => self.disabled(Some(target), reason),
        }
    }

    fn transition(&self, next: ProxyState) {
        let prev = self.state.send_replace(next);
        debug!(from = ?prev, to = ?next, "proxy state transition");
    }

    fn disabled(&self, target: Option<ProxyTarget>, reason: DisabledReason) -> ProxyOutcome {
        match reason {
            DisabledReason::NotEnabled => info!("dev proxy off; serving everything locally"),
            ref other => warn!(reason = %other, "dev proxy disabled; serving everything locally"),
        }
        self.transition(ProxyState::Disabled);
        ProxyOutcome {
            state: ProxyState::Disabled,
            target,
            reason: Some(reason),
            process: None,
        }
    }

    /// The tool must resolve and the package metadata and installed
    /// dependencies must be present in the working directory.
    fn check_toolchain(&self) -> Result<DevServerCommand, DisabledReason> {
        let settings = &self.settings;
        let program =
            locate_program(&settings.program, &settings.working_dir).map_err(DisabledReason::ToolNotFound)?;

        let manifest = settings.working_dir.join(&settings.manifest);
        if !manifest.is_file() {
            return Err(DisabledReason::ManifestMissing(manifest));
        }

        let deps = settings.working_dir.join(&settings.dependencies_dir);
        if !deps.is_dir() {
            return Err(DisabledReason::DependenciesMissing(deps));
        }

        Ok(DevServerCommand {
            program,
            args: settings.args.clone(),
            working_dir: settings.working_dir.clone(),
            terminate_on_exit: settings.terminate_on_exit,
        })
    }

    /// Poll the probe until it succeeds, the child exits, or the launch
    /// timeout passes.
    async fn wait_until_ready(
        &self,
        target: &ProxyTarget,
        child: &mut DevServerHandle,
    ) -> Result<(), DisabledReason> {
        let deadline = Instant::now() + self.settings.launch_timeout;
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if self.probe.probe(target).await {
                return Ok(());
            }

            match child.try_exit() {
                Ok(Some(exit)) => return Err(DisabledReason::ExitedEarly(exit)),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "could not query dev server status"),
            }

            if Instant::now() >= deadline {
                return Err(DisabledReason::Timeout(self.settings.launch_timeout));
            }
        }
    }
}
