#![allow(dead_code)]

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use devreload_test_utils::{init_tracing, with_timeout};

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// A local port nothing is listening on (best effort: bound, then released).
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Poll `check` every 25ms until it holds or `limit` passes.
pub async fn eventually(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// A directory that passes the dev-server toolchain check: package
/// metadata, installed dependencies and an executable at `bin/dev-server`.
pub fn dev_server_fixture(root: &Path) -> PathBuf {
    let dir = root.join("BrowserScripts");
    write_file(&dir, "package.json", "{}");
    fs::create_dir_all(dir.join("node_modules")).unwrap();
    write_file(&dir, "bin/dev-server", "#!/bin/sh\n");
    dir
}
