use std::path::Path;

use crewsync_core::config::AppConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::load_config;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => run_config_init(force, config_path),
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

pub fn run_config_init(force: bool, config_path: &Path) -> Result<(), CliError> {
    if config_path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        )));
    }

    AppConfig::default().save_to_path(config_path)?;
    println!("Wrote default config to {}", config_path.display());
    println!("Set CREWSYNC_SALESFORCE_TOKEN in the environment or .env");
    println!("Optional: CREWSYNC_TWILIO_AUTH_TOKEN, CREWSYNC_EXPO_ACCESS_TOKEN");
    Ok(())
}
