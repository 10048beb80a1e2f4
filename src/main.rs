//! Filedrop entry point
//!
//! Wires configuration, storage, the ledger, the broadcast hub and the HTTP
//! server together, then serves until the process is killed.

use std::sync::Arc;

use clap::Parser;
use filedrop::config::Config;
use filedrop::hub::Hub;
use filedrop::ledger::Ledger;
use filedrop::rest_api::{self, AppState};
use filedrop::store::LocalStore;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    info!("starting filedrop v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::parse();
    tokio::fs::create_dir_all(&config.data_dir).await?;

    // Every session starts from a clean slate: empty ledger, empty store.
    let ledger = Arc::new(Ledger::new(config.ledger_path()));
    ledger.reset().await?;
    let store = Arc::new(LocalStore::open(&config.data_dir).await?);
    store.reset().await?;
    info!(data_dir = %config.data_dir.display(), "session state reset");

    let hub = Hub::new(config.queue_capacity);

    // Bootstrap runs in the background; the server accepts uploads while
    // peers are still being dialed.
    if config.peers.is_empty() {
        info!("no peers configured, skipping bootstrap");
    } else {
        let peers = config.peers.clone();
        let dial_timeout = config.dial_timeout();
        tokio::spawn(async move {
            filedrop::bootstrap::bootstrap(&peers, dial_timeout).await;
        });
    }

    let state = AppState {
        ledger,
        store,
        hub,
    };
    rest_api::run_server(state, config.listen).await
}
