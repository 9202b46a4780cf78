//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Multi-Repository Workspace - Manage checkouts, pins, and rolling updates
#[derive(Parser, Debug)]
#[command(name = "repo-workspace")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize (or re-initialize) a workspace in the current directory
    Init(commands::init::InitArgs),
    /// Check out repositories and their transitive dependencies
    Checkout(commands::checkout::CheckoutArgs),
    /// Pin dependencies of the current repository to their checked-out revisions
    Pin(commands::pin::PinArgs),
    /// Apply a dependency rolling schedule and make corresponding updates
    Roll(commands::roll::RollArgs),
    /// Sync dependent repositories to the pins of the current repository
    Sync(commands::sync::SyncArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.clone()),
        )
        .format_timestamp(None)
        .init();

        match self.command {
            Commands::Init(args) => commands::init::execute(args),
            Commands::Checkout(args) => commands::checkout::execute(args),
            Commands::Pin(args) => commands::pin::execute(args),
            Commands::Roll(args) => commands::roll::execute(args),
            Commands::Sync(args) => commands::sync::execute(args),
        }
    }
}
