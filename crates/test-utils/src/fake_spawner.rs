use std::future::Future;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use devreload::proxy::{
    ChildExit, DevServerChild, DevServerCommand, LivenessProbe, ProcessSpawner, ProxyTarget,
};

/// What a fake dev server does once spawned.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Reports an exit with this code on the first status check.
    ExitImmediately(i32),
    /// Binds a listener at the address, so the probe starts succeeding.
    Bind(SocketAddr),
    /// Keeps running and never listens.
    RunForever,
    /// `spawn` itself fails.
    FailToSpawn,
}

/// A fake spawner that counts spawns and records the commands it was given.
#[derive(Debug, Clone)]
pub struct FakeSpawner {
    behaviour: FakeBehaviour,
    spawned: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<DevServerCommand>>>,
}

impl FakeSpawner {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        Self {
            behaviour,
            spawned: Arc::new(AtomicUsize::new(0)),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<DevServerCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[derive(Debug)]
struct FakeChild {
    exit: Option<ChildExit>,
    _listener: Option<TcpListener>,
}

impl DevServerChild for FakeChild {
    fn id(&self) -> Option<u32> {
        None
    }

    fn try_exit(&mut self) -> io::Result<Option<ChildExit>> {
        Ok(self.exit)
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(&self, command: &DevServerCommand) -> anyhow::Result<Box<dyn DevServerChild>> {
        self.commands.lock().unwrap().push(command.clone());

        let child = match &self.behaviour {
            FakeBehaviour::FailToSpawn => anyhow::bail!("no such program: {:?}", command.program),
            FakeBehaviour::ExitImmediately(code) => FakeChild {
                exit: Some(ChildExit { code: Some(*code) }),
                _listener: None,
            },
            FakeBehaviour::Bind(addr) => FakeChild {
                exit: None,
                _listener: Some(TcpListener::bind(addr)?),
            },
            FakeBehaviour::RunForever => FakeChild {
                exit: None,
                _listener: None,
            },
        };
        self.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(child))
    }
}

/// A probe with scripted answers: `false` for the first `down_for` calls,
/// then `up`.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    up: bool,
    down_for: usize,
    calls: Arc<AtomicUsize>,
}

impl StaticProbe {
    pub fn always(up: bool) -> Self {
        Self {
            up,
            down_for: 0,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn up_after(down_for: usize) -> Self {
        Self {
            up: true,
            down_for,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LivenessProbe for StaticProbe {
    fn probe<'a>(&'a self, _target: &'a ProxyTarget) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = n >= self.down_for && self.up;
        Box::pin(async move { answer })
    }
}
