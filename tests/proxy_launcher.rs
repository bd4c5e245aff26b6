// tests/proxy_launcher.rs
mod common;
use crate::common::{dev_server_fixture, free_port, init_tracing, with_timeout};

use std::fs;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::time::Duration;

use tokio::sync::watch;

use devreload::config::ConfigFile;
use devreload::proxy::{
    ChildExit, DevProxyLauncher, DisabledReason, LaunchSettings, LivenessProbe, ProcessSpawner,
    ProxyState, TcpProbe,
};
use devreload_test_utils::builders::ConfigFileBuilder;
use devreload_test_utils::fake_spawner::{FakeBehaviour, FakeSpawner, StaticProbe};

fn config(root: &Path, address: Option<&str>) -> ConfigFile {
    let mut builder = ConfigFileBuilder::new(root)
        .without_compiler()
        .dev_server_program("bin/dev-server", &["run", "dev"])
        .poll_interval(Duration::from_millis(20))
        .launch_timeout(Duration::from_secs(2));
    if let Some(address) = address {
        builder = builder.proxy_address(address);
    }
    builder.build()
}

fn make_launcher<P: LivenessProbe, S: ProcessSpawner>(
    settings: LaunchSettings,
    probe: P,
    spawner: S,
) -> (DevProxyLauncher<P, S>, watch::Receiver<ProxyState>) {
    let (tx, rx) = watch::channel(ProxyState::Unknown);
    (DevProxyLauncher::new(settings, probe, spawner, tx), rx)
}

fn tcp_probe() -> TcpProbe {
    TcpProbe::new(Duration::from_millis(250))
}

#[tokio::test]
async fn existing_listener_means_ready_without_spawning() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    dev_server_fixture(dir.path());
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let cfg = config(dir.path(), Some(&format!("http://127.0.0.1:{port}/")));
    let spawner = FakeSpawner::new(FakeBehaviour::RunForever);
    let (launcher, state) = make_launcher(LaunchSettings::from_config(&cfg), tcp_probe(), spawner.clone());
    assert_eq!(launcher.state(), ProxyState::Unknown);

    let outcome = with_timeout(launcher.establish(cfg.tree())).await;

    assert_eq!(outcome.state, ProxyState::Ready);
    assert_eq!(*state.borrow(), ProxyState::Ready);
    assert_eq!(spawner.spawn_count(), 0);
    assert!(outcome.process.is_none());
    assert_eq!(outcome.target.map(|t| t.port), Some(port));
}

#[tokio::test]
async fn early_exit_disables_instead_of_polling_forever() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    dev_server_fixture(dir.path());
    let cfg = config(dir.path(), Some(&format!("http://127.0.0.1:{}/", free_port())));
    let spawner = FakeSpawner::new(FakeBehaviour::ExitImmediately(1));
    let (launcher, state) = make_launcher(LaunchSettings::from_config(&cfg), tcp_probe(), spawner.clone());

    let outcome = with_timeout(launcher.establish(cfg.tree())).await;

    assert_eq!(outcome.state, ProxyState::Disabled);
    assert_eq!(*state.borrow(), ProxyState::Disabled);
    assert_eq!(
        outcome.reason,
        Some(DisabledReason::ExitedEarly(ChildExit { code: Some(1) }))
    );
    assert_eq!(spawner.spawn_count(), 1);
}

#[tokio::test]
async fn spawned_server_becomes_ready_once_it_listens() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let working_dir = dev_server_fixture(dir.path());
    let port = free_port();
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();

    let cfg = config(dir.path(), Some(&format!("http://127.0.0.1:{port}/")));
    let spawner = FakeSpawner::new(FakeBehaviour::Bind(addr));
    let (launcher, _state) = make_launcher(LaunchSettings::from_config(&cfg), tcp_probe(), spawner.clone());

    let outcome = with_timeout(launcher.establish(cfg.tree())).await;

    assert_eq!(outcome.state, ProxyState::Ready);
    assert!(outcome.process.is_some(), "launcher should own the spawned server");
    assert_eq!(spawner.spawn_count(), 1);

    let commands = spawner.commands();
    assert_eq!(commands[0].program, working_dir.join("bin/dev-server"));
    assert_eq!(commands[0].args, vec!["run".to_string(), "dev".to_string()]);
    assert_eq!(commands[0].working_dir, working_dir);
    assert!(commands[0].terminate_on_exit);
}

#[tokio::test]
async fn polls_until_probe_succeeds() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    dev_server_fixture(dir.path());
    let cfg = config(dir.path(), Some("http://localhost:5173/"));
    let probe = StaticProbe::up_after(4);
    let spawner = FakeSpawner::new(FakeBehaviour::RunForever);
    let (launcher, _state) = make_launcher(LaunchSettings::from_config(&cfg), probe.clone(), spawner.clone());

    let outcome = with_timeout(launcher.establish(cfg.tree())).await;

    assert_eq!(outcome.state, ProxyState::Ready);
    assert_eq!(probe.calls(), 5);
    assert_eq!(spawner.spawn_count(), 1);
}

#[tokio::test]
async fn launch_timeout_disables() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    dev_server_fixture(dir.path());
    let cfg = config(dir.path(), Some("http://localhost:5173/"));
    let mut settings = LaunchSettings::from_config(&cfg);
    settings.launch_timeout = Duration::from_millis(150);
    let (launcher, _state) = make_launcher(
        settings,
        StaticProbe::always(false),
        FakeSpawner::new(FakeBehaviour::RunForever),
    );

    let outcome = with_timeout(launcher.establish(cfg.tree())).await;

    assert_eq!(outcome.state, ProxyState::Disabled);
    assert_eq!(
        outcome.reason,
        Some(DisabledReason::Timeout(Duration::from_millis(150)))
    );
    assert!(outcome.process.is_none());
}

#[tokio::test]
async fn missing_address_disables_without_probing() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    dev_server_fixture(dir.path());
    let cfg = config(dir.path(), None);
    let probe = StaticProbe::always(true);
    let (launcher, _state) = make_launcher(
        LaunchSettings::from_config(&cfg),
        probe.clone(),
        FakeSpawner::new(FakeBehaviour::RunForever),
    );

    let outcome = launcher.establish(cfg.tree()).await;

    assert_eq!(outcome.state, ProxyState::Disabled);
    assert!(matches!(outcome.reason, Some(DisabledReason::Configuration(_))));
    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn invalid_address_disables() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), Some("localhost-without-scheme"));
    let (launcher, _state) = make_launcher(
        LaunchSettings::from_config(&cfg),
        StaticProbe::always(true),
        FakeSpawner::new(FakeBehaviour::RunForever),
    );

    let outcome = launcher.establish(cfg.tree()).await;
    assert!(matches!(outcome.reason, Some(DisabledReason::Configuration(_))));
}

#[tokio::test]
async fn toolchain_checks_run_before_spawning() {
    init_tracing();

    // Dependencies not installed.
    let dir = tempfile::tempdir().unwrap();
    let working_dir = dev_server_fixture(dir.path());
    fs::remove_dir(working_dir.join("node_modules")).unwrap();
    let cfg = config(dir.path(), Some("http://localhost:5173/"));
    let spawner = FakeSpawner::new(FakeBehaviour::RunForever);
    let (launcher, _) = make_launcher(
        LaunchSettings::from_config(&cfg),
        StaticProbe::always(false),
        spawner.clone(),
    );
    let outcome = launcher.establish(cfg.tree()).await;
    assert_eq!(
        outcome.reason,
        Some(DisabledReason::DependenciesMissing(working_dir.join("node_modules")))
    );
    assert_eq!(spawner.spawn_count(), 0);

    // Package metadata missing.
    let dir = tempfile::tempdir().unwrap();
    let working_dir = dev_server_fixture(dir.path());
    fs::remove_file(working_dir.join("package.json")).unwrap();
    let cfg = config(dir.path(), Some("http://localhost:5173/"));
    let (launcher, _) = make_launcher(
        LaunchSettings::from_config(&cfg),
        StaticProbe::always(false),
        spawner.clone(),
    );
    let outcome = launcher.establish(cfg.tree()).await;
    assert_eq!(
        outcome.reason,
        Some(DisabledReason::ManifestMissing(working_dir.join("package.json")))
    );

    // Tool not present.
    let dir = tempfile::tempdir().unwrap();
    dev_server_fixture(dir.path());
    let cfg = config(dir.path(), Some("http://localhost:5173/"));
    let mut settings = LaunchSettings::from_config(&cfg);
    settings.program = "bin/not-installed".to_string();
    let (launcher, _) = make_launcher(settings, StaticProbe::always(false), spawner.clone());
    let outcome = launcher.establish(cfg.tree()).await;
    assert!(matches!(outcome.reason, Some(DisabledReason::ToolNotFound(_))));

    assert_eq!(spawner.spawn_count(), 0);
}

#[tokio::test]
async fn spawn_error_disables() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    dev_server_fixture(dir.path());
    let cfg = config(dir.path(), Some("http://localhost:5173/"));
    let (launcher, _) = make_launcher(
        LaunchSettings::from_config(&cfg),
        StaticProbe::always(false),
        FakeSpawner::new(FakeBehaviour::FailToSpawn),
    );

    let outcome = launcher.establish(cfg.tree()).await;
    assert!(matches!(outcome.reason, Some(DisabledReason::SpawnFailed(_))));
}

#[tokio::test]
async fn disabled_by_configuration() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = ConfigFileBuilder::new(dir.path())
        .without_dev_server()
        .proxy_address("http://localhost:5173/")
        .build();
    let probe = StaticProbe::always(true);
    let (launcher, state) = make_launcher(
        LaunchSettings::from_config(&cfg),
        probe.clone(),
        FakeSpawner::new(FakeBehaviour::RunForever),
    );

    let outcome = launcher.establish(cfg.tree()).await;
    assert_eq!(outcome.reason, Some(DisabledReason::NotEnabled));
    assert_eq!(*state.borrow(), ProxyState::Disabled);
    assert_eq!(probe.calls(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn real_process_exiting_early_is_detected() {
    use devreload::proxy::TokioSpawner;

    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    dev_server_fixture(dir.path());
    let cfg = config(dir.path(), Some(&format!("http://127.0.0.1:{}/", free_port())));
    let mut settings = LaunchSettings::from_config(&cfg);
    settings.program = "sh".to_string();
    settings.args = vec!["-c".to_string(), "echo starting; exit 3".to_string()];

    let (launcher, _) = make_launcher(settings, tcp_probe(), TokioSpawner);
    let outcome = with_timeout(launcher.establish(cfg.tree())).await;

    assert_eq!(outcome.state, ProxyState::Disabled);
    assert_eq!(
        outcome.reason,
        Some(DisabledReason::ExitedEarly(ChildExit { code: Some(3) }))
    );
}
