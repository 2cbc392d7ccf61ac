//! crewsync CLI - field crew sync queue and inactivity escalation
//!
//! Every core operation is exposed as a subcommand; `crewsync run` keeps both
//! background services alive until Ctrl-C.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::{resolve_config_path, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::inactive::run_inactive;
use crate::commands::queue::run_queue;
use crate::commands::record::run_record;
use crate::commands::run::run_services;
use crate::commands::shift::run_shift;
use crate::commands::worker::run_worker;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "crewsync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let config_path = resolve_config_path(cli.config);

    match cli.command {
        Commands::Worker { command } => run_worker(command, &db_path).await?,
        Commands::Shift { command } => run_shift(command, &db_path).await?,
        Commands::Record { command } => run_record(command, &db_path, &config_path).await?,
        Commands::Queue { command } => run_queue(command, &db_path, &config_path).await?,
        Commands::Inactive { command } => {
            run_inactive(command, &db_path, &config_path).await?;
        }
        Commands::Config { command } => run_config(command, &config_path)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
        Commands::Run => run_services(&db_path, &config_path).await?,
    }

    Ok(())
}
