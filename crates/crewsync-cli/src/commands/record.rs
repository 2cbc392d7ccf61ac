use std::path::Path;

use crewsync_core::util::now_ms;
use crewsync_core::{RecordType, SyncRunStats, WorkRecord};

use crate::cli::RecordCommands;
use crate::commands::common::{
    build_processor, load_config, open_database, parse_payload, parse_worker_id,
};
use crate::error::CliError;

pub async fn run_record(
    command: RecordCommands,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    let record_type = command.record_type();
    let (RecordCommands::Survey { worker, payload }
    | RecordCommands::Appointment { worker, payload }) = command;

    let record = submit_record(record_type, &worker, &payload, db_path).await?;
    println!("Queued {record_type} {}", record.id);

    match deliver_now(db_path, config_path).await {
        Ok(stats) if stats.is_empty() => println!("CRM unreachable; will retry later"),
        Ok(stats) => println!(
            "Delivery pass: {} delivered, {} duplicate(s), {} retrying, {} failed",
            stats.delivered, stats.duplicates, stats.retried, stats.failed
        ),
        Err(error) => {
            tracing::warn!("Record stays queued, delivery skipped: {error}");
        }
    }
    Ok(())
}

pub async fn submit_record(
    record_type: RecordType,
    worker: &str,
    payload: &str,
    db_path: &Path,
) -> Result<WorkRecord, CliError> {
    let worker_id = parse_worker_id(worker)?;
    let payload = parse_payload(payload)?;
    let db = open_database(db_path).await?;
    let (record, _item) = db
        .submit_record(record_type, &worker_id, payload, now_ms())
        .await?;
    Ok(record)
}

async fn deliver_now(db_path: &Path, config_path: &Path) -> Result<SyncRunStats, CliError> {
    let config = load_config(config_path)?;
    let db = open_database(db_path).await?;
    let processor = build_processor(db, &config)?;
    Ok(processor.run_pass(now_ms()).await?)
}
