// src/proxy/mod.rs

//! Dev-server discovery and launch.
//!
//! The launcher resolves the dev-proxy address from the configuration tree,
//! probes it, and launches the dev server only when nothing is listening
//! yet. Its final [`ProxyState`] decides how requests are routed (see
//! [`crate::routing`]).

pub mod address;
pub mod launcher;
pub mod probe;
pub mod process;

pub use address::{find_leaf, resolve_proxy_target, ConfigTree, ProxyTarget};
pub use launcher::{DevProxyLauncher, DisabledReason, LaunchSettings, ProxyOutcome, ProxyState};
pub use probe::{LivenessProbe, TcpProbe};
pub use process::{
    ChildExit, DevServerChild, DevServerCommand, DevServerHandle, ProcessSpawner, TokioSpawner,
};
