//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// debrepo - self-hosted debian repository controller
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: debrepo.toml)
    #[arg(short = 'C', long, default_value = "debrepo.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the repository, rebuilding distributions when their pools change
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not watch pool directories for changes
        #[arg(long)]
        no_watch: bool,
    },

    /// Rebuild distributions now (all configured ones if none are named)
    #[command(visible_alias = "u")]
    Update {
        /// Distributions to rebuild
        #[arg(value_name = "DIST")]
        dists: Vec<String>,
    },

    /// Run one backup and prune cycle, then exit
    #[command(visible_alias = "b")]
    Backup,
}
