//! CLI module for Stevedore
//!
//! Provides commands:
//! - `check`: Verify the Docker daemon is reachable
//! - `run`: Run one command inside a fresh sandbox container

use clap::{Parser, Subcommand};

pub mod check;
pub mod run;

/// Stevedore sandbox runner CLI
#[derive(Parser, Debug)]
#[command(name = "stevedore")]
#[command(about = "Run commands inside disposable Docker sandboxes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the Docker daemon is reachable
    Check,
    /// Run a command inside a new sandbox container
    Run(run::RunArgs),
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Check) => check::run().await,
        Some(Commands::Run(args)) => run::run(args).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
