use std::path::Path;

use crewsync_core::models::ShiftStorage;
use crewsync_core::util::now_ms;

use crate::cli::ShiftCommands;
use crate::commands::common::{
    format_shift_lines, format_timestamp, open_database, parse_worker_id,
};
use crate::error::CliError;

pub async fn run_shift(command: ShiftCommands, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let now = now_ms();

    match command {
        ShiftCommands::ClockIn { worker, local_only } => {
            let worker_id = parse_worker_id(&worker)?;
            let storage = if local_only {
                ShiftStorage::LocalOnly
            } else {
                ShiftStorage::Remote
            };
            let shift = db.clock_in(&worker_id, now, storage).await?;
            println!(
                "Clocked in at {} (shift {}, {})",
                format_timestamp(shift.clock_in_at),
                shift.id,
                shift.storage
            );
        }
        ShiftCommands::ClockOut { worker } => {
            let worker_id = parse_worker_id(&worker)?;
            let shift = db.clock_out(&worker_id, now).await?;
            println!("Clocked out of shift {}", shift.id);
        }
        ShiftCommands::ExitSession { worker } => {
            let worker_id = parse_worker_id(&worker)?;
            let shift = db.exit_session(&worker_id, now).await?;
            println!("Session exit recorded on shift {}", shift.id);
        }
        ShiftCommands::Heartbeat { worker } => {
            let worker_id = parse_worker_id(&worker)?;
            db.record_heartbeat(&worker_id, now).await?;
            println!("Heartbeat recorded");
        }
        ShiftCommands::Open { json } => {
            let shifts = db.list_open_shifts().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&shifts)?);
            } else if shifts.is_empty() {
                println!("No open shifts.");
            } else {
                for line in format_shift_lines(&shifts) {
                    println!("{line}");
                }
            }
        }
    }

    Ok(())
}
