// src/proxy/probe.rs

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

use crate::proxy::address::ProxyTarget;

/// Checks whether something accepts connections at a target.
pub trait LivenessProbe: Send + Sync {
    fn probe<'a>(&'a self, target: &'a ProxyTarget) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;
}

/// TCP connect with a timeout; no protocol data is exchanged.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl LivenessProbe for TcpProbe {
    fn probe<'a>(&'a self, target: &'a ProxyTarget) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            let connect = TcpStream::connect((target.host.as_str(), target.port));
            match timeout(self.timeout, connect).await {
                Ok(Ok(_stream)) => true,
                Ok(Err(e)) => {
                    trace!(%target, error = %e, "probe connect failed");
                    false
                }
                Err(_) => {
                    trace!(%target, timeout = ?self.timeout, "probe timed out");
                    false
                }
            }
        })
    }
}
