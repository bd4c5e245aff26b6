// src/compile/backend.rs

//! Pluggable compiler backend.
//!
//! [`BatchCompiler`](super::BatchCompiler) talks to a `CompilerBackend`
//! instead of spawning processes itself, so tests can provide a fake that
//! records requests and writes outputs directly.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::DevReloadError;
use crate::toolchain::locate_program;

/// One compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Working directory for the compiler (the project root).
    pub working_dir: PathBuf,
    /// Sources to compile, relative to `working_dir` where possible.
    pub sources: Vec<PathBuf>,
    pub output_dir: PathBuf,
}

/// Exit outcome of a compiler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    Success,
    Failed(i32),
}

/// Trait abstracting how the compiler is invoked.
pub trait CompilerBackend: Send {
    fn compile(
        &mut self,
        request: CompileRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompileOutcome>> + Send + '_>>;
}

/// Runs the external compiler as a child process:
/// `program [extra_args..] <sources..> <outdir_flag> <output_dir>`.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    program: PathBuf,
    extra_args: Vec<String>,
    outdir_flag: String,
}

impl ProcessCompiler {
    pub fn new(program: impl Into<PathBuf>, extra_args: Vec<String>, outdir_flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args,
            outdir_flag: outdir_flag.into(),
        }
    }

    fn command(&self, request: &CompileRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args)
            .args(&request.sources)
            .arg(&self.outdir_flag)
            .arg(&request.output_dir)
            .current_dir(&request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl CompilerBackend for ProcessCompiler {
    fn compile(
        &mut self,
        request: CompileRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompileOutcome>> + Send + '_>> {
        Box::pin(async move {
            debug!(
                program = ?self.program,
                sources = request.sources.len(),
                "starting compiler"
            );

            let mut child = self
                .command(&request)
                .spawn()
                .with_context(|| format!("spawning compiler {:?}", self.program))?;

            if let Some(stdout) = child.stdout.take() {
                tokio::spawn(pump_lines("stdout", stdout));
            }
            if let Some(stderr) = child.stderr.take() {
                tokio::spawn(pump_lines("stderr", stderr));
            }

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for compiler {:?}", self.program))?;

            let code = status.code().unwrap_or(-1);
            info!(exit_code = code, success = status.success(), "compiler exited");

            Ok(if status.success() {
                CompileOutcome::Success
            } else {
                CompileOutcome::Failed(code)
            })
        })
    }
}

/// Consume a child's output so its pipe never fills; log at debug.
pub(crate) async fn pump_lines<R: AsyncRead + Unpin>(stream: &'static str, reader: R) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(stream, "compiler: {}", line);
    }
}

/// Resolve the compiler executable against `project_root` / `PATH`.
pub fn locate_compiler(program: &str, project_root: &Path) -> crate::errors::Result<PathBuf> {
    locate_program(program, project_root).map_err(|reason| {
        DevReloadError::ToolchainMissing(format!(
            "compiler unavailable: {reason}; install the project's script dependencies \
             (e.g. `npm ci --no-audit --ignore-scripts`) first"
        ))
    })
}
