use std::path::Path;

use crewsync_core::activity::{InactivityAdmin, InactivityDetector};
use crewsync_core::util::now_ms;
use crewsync_core::InactiveWorker;

use crate::cli::InactiveCommands;
use crate::commands::common::{
    format_inactive_lines, format_log_lines, load_config, normalize_reason, open_database,
    parse_shift_id, parse_worker_id,
};
use crate::error::CliError;

pub async fn run_inactive(
    command: InactiveCommands,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    match command {
        InactiveCommands::Scan { threshold, json } => {
            let threshold = match threshold {
                Some(minutes) => minutes,
                None => load_config(config_path)?.inactivity.threshold_minutes,
            };
            let flagged = scan_inactive(threshold, db_path).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&flagged)?);
            } else if flagged.is_empty() {
                println!("No workers inactive for {threshold} min or more.");
            } else {
                for line in format_inactive_lines(&flagged) {
                    println!("{line}");
                }
            }
        }
        InactiveCommands::ForceClockOut { shift, reason } => {
            let shift_id = parse_shift_id(&shift)?;
            let reason = normalize_reason(&reason)?;
            let db = open_database(db_path).await?;
            let (closed, entry) = InactivityAdmin::new(db)
                .force_clock_out(&shift_id, &reason, now_ms())
                .await?;
            println!(
                "Clocked out shift {} ({} storage), {} min inactive",
                closed.id,
                closed.storage,
                entry.inactive_minutes.unwrap_or_default()
            );
        }
        InactiveCommands::Notify { worker, reason } => {
            let worker_id = parse_worker_id(&worker)?;
            let reason = normalize_reason(&reason)?;
            let db = open_database(db_path).await?;
            let entry = InactivityAdmin::new(db)
                .log_manual_notification(&worker_id, &reason, now_ms())
                .await?;
            println!("Logged notification #{} for worker {worker_id}", entry.id);
        }
        InactiveCommands::Log {
            worker,
            limit,
            json,
        } => {
            let worker_id = worker.as_deref().map(parse_worker_id).transpose()?;
            let db = open_database(db_path).await?;
            let entries = db.list_inactivity_log(worker_id.as_ref(), limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("Inactivity log is empty.");
            } else {
                for line in format_log_lines(&entries) {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}

pub async fn scan_inactive(
    threshold_minutes: i64,
    db_path: &Path,
) -> Result<Vec<InactiveWorker>, CliError> {
    let db = open_database(db_path).await?;
    let detector = InactivityDetector::new(db);
    Ok(detector
        .scan_for_inactive_workers(threshold_minutes, now_ms())
        .await?)
}
