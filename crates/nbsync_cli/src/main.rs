//! `nbsync` command line client.
//!
//! Local commands work on one store file; remote commands talk to an
//! `nbsync-server` over HTTP.

mod cli;
mod commands {
    pub mod local;
    pub mod remote;
}

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use nbsync_core::SyncService;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    nbsync_core::init_logging(&cli.log_level, None).map_err(|err| anyhow!(err))?;
    let store = SyncService::open(&cli.db)
        .with_context(|| format!("failed to open notebook store at {}", cli.db.display()))?;

    match cli.cmd {
        Command::Seed { dir, template_file } => {
            commands::local::run_seed(&store, dir, template_file)
        }
        Command::List => commands::local::run_list(&store),
        Command::Template { author, app } => commands::local::run_template(&store, &author, &app),
        Command::Export { out } => commands::local::run_export(&store, &out),
        Command::Merge { snapshot } => commands::local::run_merge(&store, &snapshot),
        Command::Push { server } => commands::remote::run_push(&store, &server),
        Command::Pull { server } => commands::remote::run_pull(&store, &server),
        Command::Defaults { server, force } => {
            commands::remote::run_defaults(&store, &server, force)
        }
    }
}
