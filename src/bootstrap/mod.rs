//! Startup peer bootstrap
//!
//! Dials every configured peer concurrently, once, at process start. Each
//! attempt succeeds or fails on its own; one unreachable peer never blocks
//! or fails the others. Failures are logged, not fatal; joining the wider
//! network is best-effort and the service runs fine without it.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::Error;

/// Outcome of one bootstrap run. Consumed only by logging and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootstrapSummary {
    pub attempted: usize,
    pub connected: usize,
}

impl BootstrapSummary {
    /// Fewer than half the configured peers were reachable.
    pub fn degraded(&self) -> bool {
        self.connected < self.attempted / 2
    }
}

/// Dial all `peers` concurrently and report how many answered.
///
/// Logs a degraded-connectivity warning when fewer than half the peers were
/// reachable; the warning is advisory and the caller proceeds regardless.
pub async fn bootstrap(peers: &[String], dial_timeout: Duration) -> BootstrapSummary {
    let mut attempts = JoinSet::new();
    for addr in peers {
        let addr = addr.clone();
        attempts.spawn(async move { dial(addr, dial_timeout).await });
    }

    let mut connected = 0;
    while let Some(outcome) = attempts.join_next().await {
        match outcome {
            Ok(Ok(addr)) => {
                info!(peer = %addr, "connected to peer");
                connected += 1;
            }
            Ok(Err(e)) => warn!(error = %e, "peer dial failed"),
            Err(e) => warn!(error = %e, "peer dial task panicked"),
        }
    }

    let summary = BootstrapSummary {
        attempted: peers.len(),
        connected,
    };
    if summary.degraded() {
        warn!(
            connected = summary.connected,
            attempted = summary.attempted,
            "degraded network connectivity after bootstrap"
        );
    } else {
        info!(
            connected = summary.connected,
            attempted = summary.attempted,
            "peer bootstrap finished"
        );
    }
    summary
}

async fn dial(addr: String, dial_timeout: Duration) -> Result<String, Error> {
    match tokio::time::timeout(dial_timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(_stream)) => Ok(addr),
        Ok(Err(e)) => Err(Error::PeerDial {
            addr,
            reason: e.to_string(),
        }),
        Err(_) => Err(Error::PeerDial {
            addr,
            reason: format!("timed out after {dial_timeout:?}"),
        }),
    }
}
