use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use devreload::compile::{CompileOutcome, CompileRequest, CompilerBackend, OutputMapper};
use devreload::fs::mock::MockFileSystem;
use devreload::fs::FileSystem;

/// A fake compiler that:
/// - records every request it receives
/// - snapshots the mock filesystem at the moment it is invoked
/// - writes one output per source at the mapped path (when succeeding)
///
/// Clones share their recordings, so a test can keep one clone and hand
/// the other to a `BatchCompiler`.
#[derive(Clone)]
pub struct FakeCompiler {
    fs: MockFileSystem,
    mapper: OutputMapper,
    exit_code: i32,
    requests: Arc<Mutex<Vec<CompileRequest>>>,
    snapshots: Arc<Mutex<Vec<Vec<PathBuf>>>>,
}

impl FakeCompiler {
    pub fn new(fs: MockFileSystem, mapper: OutputMapper) -> Self {
        Self {
            fs,
            mapper,
            exit_code: 0,
            requests: Arc::new(Mutex::new(Vec::new())),
            snapshots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every run fail with `code` without writing outputs.
    pub fn failing(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn requests(&self) -> Vec<CompileRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Files present in the mock filesystem at the start of each run.
    pub fn snapshots(&self) -> Vec<Vec<PathBuf>> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl CompilerBackend for FakeCompiler {
    fn compile(
        &mut self,
        request: CompileRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<CompileOutcome>> + Send + '_>> {
        Box::pin(async move {
            self.snapshots.lock().unwrap().push(self.fs.file_paths());
            self.requests.lock().unwrap().push(request.clone());

            if self.exit_code != 0 {
                return Ok(CompileOutcome::Failed(self.exit_code));
            }

            for source in &request.sources {
                let full = request.working_dir.join(source);
                let output = self
                    .mapper
                    .output_for(&full)
                    .ok_or_else(|| anyhow::anyhow!("source outside root: {:?}", full))?;
                self.fs.write(&output, b"// compiled")?;
            }
            Ok(CompileOutcome::Success)
        })
    }
}
