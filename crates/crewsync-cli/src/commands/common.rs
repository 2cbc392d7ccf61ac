use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crewsync_core::config::{AppConfig, Credentials};
use crewsync_core::models::{FailedSyncItem, InactivityLogEntry, SyncRunLog};
use crewsync_core::services::DatabaseService;
use crewsync_core::sync::{ConfiguredCrm, HttpReachabilityProbe, SyncQueueProcessor};
use crewsync_core::{InactiveWorker, Shift, ShiftId, SyncQueueItem, Worker, WorkerId};
use serde_json::Value;

use crate::error::CliError;

pub type CliProcessor = SyncQueueProcessor<ConfiguredCrm, HttpReachabilityProbe>;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("CREWSYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crewsync")
        .join("crewsync.db")
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path
        .or_else(|| env::var_os("CREWSYNC_CONFIG").map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crewsync")
        .join("config.json")
}

pub fn load_config(path: &Path) -> Result<AppConfig, CliError> {
    Ok(AppConfig::load_from_path(path)?)
}

pub async fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(DatabaseService::open_path(path.to_path_buf()).await?)
}

/// Queue processor wired to the configured CRM and reachability probe.
pub fn build_processor(db: DatabaseService, config: &AppConfig) -> Result<CliProcessor, CliError> {
    let credentials = Credentials::from_env();
    let crm = ConfiguredCrm::from_settings(&config.sync.crm, &credentials)?;
    let probe = HttpReachabilityProbe::new(config.sync.reachability_url.clone())
        .map_err(|error| CliError::Probe(error.to_string()))?;
    Ok(SyncQueueProcessor::new(
        db,
        crm,
        probe,
        config.field_mapping.clone(),
        config.sync.max_attempts,
    ))
}

pub fn parse_worker_id(value: &str) -> Result<WorkerId, CliError> {
    value.parse().map_err(|_| CliError::InvalidId {
        kind: "worker",
        value: value.trim().to_string(),
    })
}

pub fn parse_shift_id(value: &str) -> Result<ShiftId, CliError> {
    value.parse().map_err(|_| CliError::InvalidId {
        kind: "shift",
        value: value.trim().to_string(),
    })
}

pub fn parse_payload(raw: &str) -> Result<Value, CliError> {
    let payload: Value = serde_json::from_str(raw)?;
    if payload.is_object() {
        Ok(payload)
    } else {
        Err(CliError::PayloadNotObject)
    }
}

pub fn normalize_reason(reason: &str) -> Result<String, CliError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyReason);
    }
    Ok(trimmed.to_string())
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn short_id(id: impl ToString) -> String {
    id.to_string().chars().take(13).collect()
}

pub fn format_worker_lines(workers: &[Worker]) -> Vec<String> {
    workers
        .iter()
        .map(|worker| {
            let mut line = format!("{}  {:<10}  {}", worker.id, worker.role.as_str(), worker.name);
            if let Some(phone) = worker.phone.as_deref() {
                line.push_str(&format!("  {phone}"));
            }
            if worker.push_token.is_some() {
                line.push_str("  [push]");
            }
            line
        })
        .collect()
}

pub fn format_shift_lines(shifts: &[Shift]) -> Vec<String> {
    shifts
        .iter()
        .map(|shift| {
            let mut line = format!(
                "{}  worker {}  in {}  ({})",
                shift.id,
                short_id(shift.worker_id),
                format_timestamp(shift.clock_in_at),
                shift.storage
            );
            if let Some(exited_at) = shift.session_exited_at {
                line.push_str(&format!("  exited {}", format_timestamp(exited_at)));
            }
            line
        })
        .collect()
}

pub fn format_queue_lines(items: &[SyncQueueItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let mut line = format!(
                "#{:<5} {:<11} {}  queued {}  attempts {}",
                item.id,
                item.record_type.as_str(),
                short_id(item.record_id),
                format_timestamp(item.enqueued_at),
                item.retry_count
            );
            if let Some(error) = item.last_error.as_deref() {
                line.push_str(&format!("  last error: {error}"));
            }
            line
        })
        .collect()
}

pub fn format_failed_lines(items: &[FailedSyncItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            format!(
                "#{:<5} {:<11} {}  failed {} after {} attempt(s): {}",
                item.id,
                item.record_type.as_str(),
                short_id(item.record_id),
                format_timestamp(item.failed_at),
                item.retry_count,
                item.last_error
            )
        })
        .collect()
}

pub fn format_run_lines(runs: &[SyncRunLog]) -> Vec<String> {
    runs.iter()
        .map(|run| {
            format!(
                "{}  delivered {}  duplicates {}  retried {}  failed {}",
                format_timestamp(run.started_at),
                run.stats.delivered,
                run.stats.duplicates,
                run.stats.retried,
                run.stats.failed
            )
        })
        .collect()
}

pub fn format_inactive_lines(workers: &[InactiveWorker]) -> Vec<String> {
    workers
        .iter()
        .map(|worker| {
            format!(
                "{} ({})  shift {}  {}",
                worker.worker_name,
                short_id(worker.worker_id),
                worker.shift_id,
                worker.reason
            )
        })
        .collect()
}

pub fn format_log_lines(entries: &[InactivityLogEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let mut line = format!(
                "{}  {:<22} by {:<6}  worker {}",
                format_timestamp(entry.created_at),
                entry.action.as_str(),
                entry.by_whom.as_str(),
                short_id(entry.worker_id)
            );
            if let Some(minutes) = entry.inactive_minutes {
                line.push_str(&format!("  {minutes} min"));
            }
            if let Some(notes) = entry.notes.as_deref() {
                line.push_str(&format!("  {notes}"));
            }
            line
        })
        .collect()
}
