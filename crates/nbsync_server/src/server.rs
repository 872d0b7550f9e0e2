//! Startup and shutdown of the whole server.

use anyhow::{Context, Result};
use log::info;
use nbsync_core::{ReconcileOptions, SyncService};

use crate::{config::Config, http::HttpServer, state::AppState};

/// Opens the configured store and applies the sync settings.
pub fn open_store(config: &Config) -> Result<SyncService> {
    let store = SyncService::open(&config.store.path).with_context(|| {
        format!(
            "failed to open notebook store at {}",
            config.store.path.display()
        )
    })?;
    let options = ReconcileOptions {
        max_rename_attempts: config.sync.max_rename_attempts,
        ..ReconcileOptions::default()
    };
    Ok(store.with_options(options))
}

/// Spawn the server and run until the `Ctrl-C` signal is received, then shutdown.
pub async fn run_with_config_until_ctrl_c(config: Config) -> Result<()> {
    let store = open_store(&config)?;
    info!(
        "event=server_start module=server status=ok db={} mode={}",
        store.location(),
        config.mode
    );

    let state = AppState::new(store, config.mode);
    let server = HttpServer::spawn(&config.http, config.sync.max_upload_bytes, state).await?;
    tokio::signal::ctrl_c().await?;
    info!("event=server_stop module=server status=ok");
    server.shutdown().await?;
    Ok(())
}
