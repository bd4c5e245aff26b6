// tests/persistent_compiler.rs
#![cfg(unix)]
mod common;
use crate::common::{eventually, init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devreload::compile::{PersistentCompiler, PersistentExit, PersistentSpec};

type TestResult = Result<(), Box<dyn Error>>;

fn spec(dir: &Path, script: &str) -> PersistentSpec {
    PersistentSpec {
        program: PathBuf::from("sh"),
        extra_args: vec!["-c".into(), script.into(), "sh".into()],
        glob: "scripts/**/*.ts".into(),
        watch_flag: "--watch".into(),
        outdir_flag: "--outdir".into(),
        output_dir: PathBuf::from("wwwroot/ts"),
        working_dir: dir.to_path_buf(),
    }
}

#[tokio::test]
async fn closing_stdin_stops_the_compiler_cleanly() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let script = r#"printf '%s\n' "$@" > args.txt; cat > /dev/null; echo bye > stopped.txt"#;
    let compiler = PersistentCompiler::start(&spec(dir.path(), script), Duration::from_secs(3))?;

    let args_file = dir.path().join("args.txt");
    assert!(eventually(Duration::from_secs(3), || args_file.exists()).await);
    assert!(compiler.is_running());

    let exit = with_timeout(compiler.shutdown()).await;
    assert_eq!(
        exit,
        Some(PersistentExit {
            code: Some(0),
            killed: false,
            premature: false
        })
    );
    assert!(dir.path().join("stopped.txt").exists());
    assert_eq!(
        fs::read_to_string(&args_file)?,
        "scripts/**/*.ts\n--watch\n--outdir\nwwwroot/ts\n"
    );
    Ok(())
}

#[tokio::test]
async fn compiler_ignoring_stdin_is_killed_after_grace() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let compiler = PersistentCompiler::start(&spec(dir.path(), "exec sleep 30"), Duration::from_millis(200))?;

    let exit = with_timeout(compiler.shutdown()).await.expect("exit");
    assert!(exit.killed);
    assert!(!exit.premature);
    Ok(())
}

#[tokio::test]
async fn early_exit_is_visible_and_reported() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let compiler = PersistentCompiler::start(&spec(dir.path(), "exit 4"), Duration::from_secs(1))?;

    assert!(eventually(Duration::from_secs(3), || !compiler.is_running()).await);

    let exit = with_timeout(compiler.shutdown()).await;
    assert_eq!(
        exit,
        Some(PersistentExit {
            code: Some(4),
            killed: false,
            premature: true
        })
    );
    Ok(())
}

#[tokio::test]
async fn missing_program_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut spec = spec(dir.path(), "");
    spec.program = dir.path().join("no-such-compiler");
    assert!(PersistentCompiler::start(&spec, Duration::from_secs(1)).is_err());
}
