// src/compile/invoker.rs

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::compile::backend::{CompileOutcome, CompileRequest, CompilerBackend};
use crate::compile::unit::{CompileUnit, OutputMapper};
use crate::fs::FileSystem;
use crate::watch::ChangeBatch;

/// What happened while applying one [`CompileUnit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Outputs actually removed.
    pub deleted: Vec<PathBuf>,
    /// Outputs that were already gone.
    pub already_absent: Vec<PathBuf>,
    /// Outputs that could not be removed, with the error text.
    pub delete_failures: Vec<(PathBuf, String)>,
    /// Compiler outcome; `None` when nothing needed compiling.
    pub outcome: Option<CompileOutcome>,
}

/// Applies compile units: deletions first, then a single compiler run.
///
/// Failures are logged and reported, never returned: a failed batch leaves
/// the previous outputs in place and the next batch proceeds normally.
pub struct BatchCompiler<B: CompilerBackend> {
    backend: B,
    fs: Arc<dyn FileSystem>,
    working_dir: PathBuf,
    output_dir: PathBuf,
}

impl<B: CompilerBackend> std::fmt::Debug for BatchCompiler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCompiler")
            .field("working_dir", &self.working_dir)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl<B: CompilerBackend> BatchCompiler<B> {
    pub fn new(
        backend: B,
        fs: Arc<dyn FileSystem>,
        working_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            fs,
            working_dir: working_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub async fn apply(&mut self, unit: CompileUnit) -> BatchReport {
        let mut report = BatchReport::default();

        for output in &unit.to_delete {
            match self.fs.remove_file(output) {
                Ok(()) => {
                    debug!(path = ?output, "removed stale output");
                    report.deleted.push(output.clone());
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    report.already_absent.push(output.clone());
                }
                Err(err) => {
                    error!(path = ?output, error = %err, "failed to delete stale output");
                    report.delete_failures.push((output.clone(), err.to_string()));
                }
            }
        }

        if unit.to_compile.is_empty() {
            return report;
        }

        let request = CompileRequest {
            working_dir: self.working_dir.clone(),
            sources: unit
                .to_compile
                .iter()
                .map(|s| relative_to(&self.working_dir, s))
                .collect(),
            output_dir: self.output_dir.clone(),
        };

        let outcome = match self.backend.compile(request.clone()).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "compiler invocation error");
                CompileOutcome::Failed(-1)
            }
        };

        if let CompileOutcome::Failed(code) = outcome {
            error!(
                exit_code = code,
                sources = ?request.sources,
                "compile failed; keeping previous outputs"
            );
        }

        report.outcome = Some(outcome);
        report
    }
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Spawn the task that turns batches into compiler runs.
///
/// Runs until the batch channel closes. Compilation of one batch overlaps
/// with the debouncer accumulating the next.
pub fn spawn_compile_worker<B>(
    mut compiler: BatchCompiler<B>,
    mapper: OutputMapper,
    mut batches: mpsc::UnboundedReceiver<ChangeBatch>,
) -> JoinHandle<()>
where
    B: CompilerBackend + 'static,
{
    tokio::spawn(async move {
        info!("compile worker started");

        while let Some(batch) = batches.recv().await {
            let unit = CompileUnit::from_batch(&batch, &mapper);
            if unit.is_empty() {
                debug!(events = batch.len(), "batch reduced to nothing");
                continue;
            }

            let report = compiler.apply(unit).await;
            match report.outcome {
                Some(CompileOutcome::Success) => info!(
                    deleted = report.deleted.len(),
                    "batch compiled"
                ),
                Some(CompileOutcome::Failed(_)) => {}
                None => debug!(deleted = report.deleted.len(), "batch applied (deletions only)"),
            }
            if !report.delete_failures.is_empty() {
                warn!(
                    failures = report.delete_failures.len(),
                    "some stale outputs could not be removed"
                );
            }
        }

        info!("compile worker finished (channel closed)");
    })
}
