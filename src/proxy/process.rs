// src/proxy/process.rs

//! Dev-server child process ownership.
//!
//! The launcher only sees the [`ProcessSpawner`] / [`DevServerChild`]
//! traits so tests can count spawns and script early exits. The real
//! implementation wraps `tokio::process::Child`.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// What to run for the dev server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevServerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Kill the process when its handle is dropped.
    pub terminate_on_exit: bool,
}

/// Exit status of a child, reduced to what the launcher reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub code: Option<i32>,
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// A running dev-server process.
pub trait DevServerChild: Send + fmt::Debug {
    fn id(&self) -> Option<u32>;

    /// Non-blocking exit check.
    fn try_exit(&mut self) -> io::Result<Option<ChildExit>>;
}

/// Starts dev-server processes.
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, command: &DevServerCommand) -> Result<Box<dyn DevServerChild>>;
}

/// Spawns real processes with Tokio; output is re-logged line by line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

#[derive(Debug)]
struct TokioDevServer {
    child: Child,
}

impl DevServerChild for TokioDevServer {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit(&mut self) -> io::Result<Option<ChildExit>> {
        Ok(self
            .child
            .try_wait()?
            .map(|status| ChildExit { code: status.code() }))
    }
}

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, command: &DevServerCommand) -> Result<Box<dyn DevServerChild>> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(command.terminate_on_exit);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning dev server {:?}", command.program))?;

        info!(
            program = ?command.program,
            args = ?command.args,
            pid = ?child.id(),
            "dev server process started"
        );

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(relay_output("stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(relay_output("stderr", stderr));
        }

        Ok(Box::new(TokioDevServer { child }))
    }
}

async fn relay_output<R: AsyncRead + Unpin>(stream: &'static str, reader: R) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!(target: "devreload::dev_server", stream, "{}", line);
    }
    debug!(stream, "dev server output closed");
}

/// Owned handle to the launched dev server, held by the supervisor for its
/// lifetime. Dropping it releases the process (and kills it when the
/// command asked for `terminate_on_exit`).
#[derive(Debug)]
pub struct DevServerHandle {
    child: Box<dyn DevServerChild>,
}

impl DevServerHandle {
    pub fn new(child: Box<dyn DevServerChild>) -> Self {
        Self { child }
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn try_exit(&mut self) -> io::Result<Option<ChildExit>> {
        self.child.try_exit()
    }
}

impl Drop for DevServerHandle {
    fn drop(&mut self) {
        debug!(pid = ?self.child.id(), "releasing dev server handle");
    }
}
