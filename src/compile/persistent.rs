// src/compile/persistent.rs

//! Compiler running in its own continuous watch mode.
//!
//! The child is started once; its stdin stays open for the supervisor's
//! lifetime. Closing stdin is the signal to exit. If the child has not exited
//! within the grace period it is killed.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::compile::backend::pump_lines;

/// How to start the compiler in watch mode:
/// `program [extra_args..] <glob> <watch_flag> <outdir_flag> <output_dir>`.
#[derive(Debug, Clone)]
pub struct PersistentSpec {
    pub program: PathBuf,
    pub extra_args: Vec<String>,
    pub glob: String,
    pub watch_flag: String,
    pub outdir_flag: String,
    pub output_dir: PathBuf,
    pub working_dir: PathBuf,
}

/// How the persistent compiler ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistentExit {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// True if it had to be killed after the grace period.
    pub killed: bool,
    /// True if it exited before shutdown was requested.
    pub premature: bool,
}

/// Owned handle to the watch-mode compiler.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) still
/// closes the child's stdin (the supervising task sees its shutdown channel
/// close).
#[derive(Debug)]
pub struct PersistentCompiler {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<PersistentExit>,
}

impl PersistentCompiler {
    pub fn start(spec: &PersistentSpec, grace: Duration) -> Result<Self> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.extra_args)
            .arg(&spec.glob)
            .arg(&spec.watch_flag)
            .arg(&spec.outdir_flag)
            .arg(&spec.output_dir)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning watch-mode compiler {:?}", spec.program))?;

        info!(
            program = ?spec.program,
            glob = %spec.glob,
            pid = ?child.id(),
            "watch-mode compiler started"
        );

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_lines("stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_lines("stderr", stderr));
        }

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut stdin = child.stdin.take();

            tokio::select! {
                status = child.wait() => {
                    let code = status.ok().and_then(|s| s.code());
                    error!(exit_code = ?code, "watch-mode compiler exited on its own");
                    PersistentExit { code, killed: false, premature: true }
                }
                _ = &mut shutdown_rx => {
                    // Closing stdin asks the compiler to exit cleanly.
                    drop(stdin.take());
                    match timeout(grace, child.wait()).await {
                        Ok(Ok(status)) => {
                            info!(exit_code = ?status.code(), "watch-mode compiler stopped");
                            PersistentExit { code: status.code(), killed: false, premature: false }
                        }
                        Ok(Err(e)) => {
                            warn!(error = %e, "failed waiting for watch-mode compiler");
                            PersistentExit { code: None, killed: false, premature: false }
                        }
                        Err(_) => {
                            warn!(?grace, "watch-mode compiler ignored stdin close; killing");
                            if let Err(e) = child.kill().await {
                                warn!(error = %e, "failed to kill watch-mode compiler");
                            }
                            PersistentExit { code: None, killed: true, premature: false }
                        }
                    }
                }
            }
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Handle for tearing the supervising task down when a shutdown deadline
    /// passes. Aborting drops the child, which kills it.
    pub fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }

    /// Close the compiler's stdin and wait for it to go away.
    pub async fn shutdown(mut self) -> Option<PersistentExit> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match (&mut self.task).await {
            Ok(exit) => Some(exit),
            Err(e) => {
                warn!(error = %e, "watch-mode compiler supervisor task failed");
                None
            }
        }
    }
}
