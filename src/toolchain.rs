// src/toolchain.rs

//! Locating external executables.

use std::path::{Path, PathBuf};

/// Resolve `program` to an executable path.
///
/// A program with more than one path component (or an absolute one) is taken
/// relative to `base` and must exist as a file; a bare name is looked up on
/// `PATH`. The error is an operator-facing description.
pub fn locate_program(program: &str, base: &Path) -> Result<PathBuf, String> {
    let as_path = Path::new(program);
    if as_path.is_absolute() || as_path.components().count() > 1 {
        let candidate = base.join(as_path);
        if candidate.is_file() {
            return Ok(candidate);
        }
        return Err(format!("{:?} does not exist", candidate));
    }

    which::which(program).map_err(|e| format!("`{program}` not found on PATH: {e}"))
}
