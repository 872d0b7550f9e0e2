use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use nbsync_server::{config::Config, server::run_with_config_until_ctrl_c};

#[derive(Parser, Debug)]
#[command(version, about = "Notebook sync server")]
struct Cli {
    /// Path to config file
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Override the listen port
    #[clap(short, long)]
    port: Option<u16>,
    /// Override the notebook store path
    #[clap(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(db) = args.db {
        config.store.path = db;
    }

    let log_dir = config
        .logging
        .dir
        .as_deref()
        .map(|dir| {
            dir.to_str()
                .ok_or_else(|| anyhow!("log dir is not valid UTF-8: {}", dir.display()))
        })
        .transpose()?;
    nbsync_core::init_logging(&config.logging.level, log_dir).map_err(|err| anyhow!(err))?;
    log::debug!(
        "event=config_load module=server status=ok source={}",
        args.config
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "default".to_string())
    );

    run_with_config_until_ctrl_c(config).await
}
