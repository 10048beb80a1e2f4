//! Runtime configuration, parsed from CLI flags and environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Service configuration.
///
/// Every flag has an environment-variable twin so the binary can run
/// unattended in a container without a wrapper script.
#[derive(Parser, Debug, Clone)]
#[command(name = "filedrop")]
#[command(about = "Content-addressed file drop with real-time arrival notifications")]
pub struct Config {
    /// Address the HTTP/WebSocket server binds to
    #[arg(long, env = "FILEDROP_LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Directory holding the ledger file and the local object store.
    /// Erased and recreated on every start (fresh-session semantics).
    #[arg(long, env = "FILEDROP_DATA_DIR", default_value = "./filedrop-data")]
    pub data_dir: PathBuf,

    /// Network peers to dial once at startup, host:port. May be repeated.
    #[arg(long = "peer", env = "FILEDROP_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Capacity of the broadcast delivery queue. Upload handlers block when
    /// the queue is full rather than dropping events.
    #[arg(long, env = "FILEDROP_QUEUE_CAPACITY", default_value_t = 64)]
    pub queue_capacity: usize,

    /// Per-peer dial timeout for the startup bootstrap, in seconds
    #[arg(long, env = "FILEDROP_DIAL_TIMEOUT_SECS", default_value_t = 5)]
    pub dial_timeout_secs: u64,
}

impl Config {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// Path of the append-only metadata ledger inside the data directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("uploaded_files.jsonl")
    }
}
