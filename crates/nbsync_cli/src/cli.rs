use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nbsync")]
#[command(about = "Notebook store sync client")]
pub struct Cli {
    /// Local notebook store
    #[arg(long, global = true, default_value = "notebooks.db")]
    pub db: PathBuf,
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load every `*.py` file of a directory, overwriting by name
    Seed {
        dir: PathBuf,
        /// File seeded as the `template` notebook
        #[arg(long = "template-file")]
        template_file: Option<String>,
    },
    /// Print the notebooks of the local store
    List,
    /// Print the notebook template with footprint URIs filled in
    Template {
        #[arg(long)]
        author: String,
        #[arg(long)]
        app: String,
    },
    /// Write a snapshot of the local store
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    /// Merge a snapshot file into the local store
    Merge { snapshot: PathBuf },
    /// Upload the local store to a server
    Push {
        #[arg(long)]
        server: String,
    },
    /// Merge the server store into the local store (marimo apps only)
    Pull {
        #[arg(long)]
        server: String,
    },
    /// Refresh local notebooks from the server defaults
    Defaults {
        #[arg(long)]
        server: String,
        /// Overwrite even when content is unchanged
        #[arg(long)]
        force: bool,
    },
}
