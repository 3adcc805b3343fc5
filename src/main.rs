mod bridge;
mod codec;
mod config;
mod error;

use std::time::Duration;
use tokio::time::interval;
use log::{error, info};

use crate::bridge::{BridgeServer, EventLog, SharedState};
use crate::config::{Config, STATS_INTERVAL_SECS};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    // Log configuration
    config.log_config();

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }

    let journal = EventLog::open(&config.journal_path);
    let state = SharedState::new();
    let bridge = BridgeServer::new(config.bind_address.clone(), state.clone(), journal);

    bridge.start().await?;
    info!("Bridge started, waiting for the controller to connect");

    start_stats_task(bridge.clone(), state).await;

    // The host drives the control API until it shuts the process down
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    bridge.stop().await;
    Ok(())
}

async fn start_stats_task(bridge: BridgeServer, state: SharedState) {
    tokio::spawn(async move {
        let mut interval_timer = interval(Duration::from_secs(STATS_INTERVAL_SECS));

        loop {
            interval_timer.tick().await;
            let (total, active) = state.get_stats();

            info!(
                "Stats - Lifecycle: {:?}, Symbols: {}, Active: {}, Display: {}",
                bridge.lifecycle(),
                total,
                active,
                bridge.active_symbols_display()
            );
        }
    });

    info!("Started stats monitoring task (every {} seconds)", STATS_INTERVAL_SECS);
}
