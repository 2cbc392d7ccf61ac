use std::path::Path;

use crewsync_core::util::now_ms;

use crate::cli::QueueCommands;
use crate::commands::common::{
    build_processor, format_failed_lines, format_queue_lines, format_run_lines, load_config,
    open_database,
};
use crate::error::CliError;

pub async fn run_queue(
    command: QueueCommands,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    match command {
        QueueCommands::List { json } => {
            let db = open_database(db_path).await?;
            let items = db.list_pending().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("Sync queue is empty.");
            } else {
                print_lines(format_queue_lines(&items));
            }
        }
        QueueCommands::Failed { limit, json } => {
            let db = open_database(db_path).await?;
            let items = db.list_failed(limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("No failed deliveries.");
            } else {
                print_lines(format_failed_lines(&items));
            }
        }
        QueueCommands::Process => run_queue_process(db_path, config_path).await?,
        QueueCommands::Stats { limit, json } => {
            let db = open_database(db_path).await?;
            let runs = db.list_sync_runs(limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else if runs.is_empty() {
                println!("No delivery passes recorded.");
            } else {
                print_lines(format_run_lines(&runs));
            }
        }
    }
    Ok(())
}

async fn run_queue_process(db_path: &Path, config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let db = open_database(db_path).await?;
    let pending = db.list_pending().await?.len();
    let processor = build_processor(db, &config)?;
    let stats = processor.run_pass(now_ms()).await?;

    if pending > 0 && stats.is_empty() {
        println!("CRM unreachable; {pending} item(s) left queued");
        return Ok(());
    }
    println!(
        "Processed {} item(s): {} delivered, {} duplicate(s), {} retrying, {} failed",
        stats.attempted(),
        stats.delivered,
        stats.duplicates,
        stats.retried,
        stats.failed
    );
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
