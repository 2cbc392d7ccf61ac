//! Row decoding helpers shared by the libSQL repositories

use std::str::FromStr;

use libsql::Row;

use crate::error::{Error, Result};
use crate::models::{
    FailedSyncItem, InactivityLogEntry, Shift, ShiftStorage, SyncQueueItem, WorkRecord, Worker,
};

/// Parse a stored text column into a typed value (ids, enums).
pub fn parse_column<T: FromStr>(raw: &str, column: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Database(format!("Invalid value in column {column}: {raw}")))
}

fn parse_payload(raw: &str) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(raw)?)
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::Database(format!("Out of range value in column {column}: {value}")))
}

/// `id, name, role, phone, push_token, created_at`
pub fn worker(row: &Row) -> Result<Worker> {
    Ok(Worker {
        id: parse_column(&row.get::<String>(0)?, "workers.id")?,
        name: row.get(1)?,
        role: parse_column(&row.get::<String>(2)?, "workers.role")?,
        phone: row.get(3)?,
        push_token: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// `id, worker_id, clock_in_at, clock_out_at, session_exited_at`
pub fn shift(row: &Row, storage: ShiftStorage) -> Result<Shift> {
    Ok(Shift {
        id: parse_column(&row.get::<String>(0)?, "shifts.id")?,
        worker_id: parse_column(&row.get::<String>(1)?, "shifts.worker_id")?,
        clock_in_at: row.get(2)?,
        clock_out_at: row.get(3)?,
        session_exited_at: row.get(4)?,
        storage,
    })
}

/// `id, record_type, worker_id, payload, created_at, synced, remote_id,
/// sync_error, needs_review, synced_at`
pub fn work_record(row: &Row) -> Result<WorkRecord> {
    Ok(WorkRecord {
        id: parse_column(&row.get::<String>(0)?, "work_records.id")?,
        record_type: parse_column(&row.get::<String>(1)?, "work_records.record_type")?,
        worker_id: parse_column(&row.get::<String>(2)?, "work_records.worker_id")?,
        payload: parse_payload(&row.get::<String>(3)?)?,
        created_at: row.get(4)?,
        synced: row.get::<i32>(5)? != 0,
        remote_id: row.get(6)?,
        sync_error: row.get(7)?,
        needs_review: row.get::<i32>(8)? != 0,
        synced_at: row.get(9)?,
    })
}

/// `id, record_type, record_id, payload, enqueued_at, retry_count, last_error`
pub fn queue_item(row: &Row) -> Result<SyncQueueItem> {
    Ok(SyncQueueItem {
        id: row.get(0)?,
        record_type: parse_column(&row.get::<String>(1)?, "sync_queue.record_type")?,
        record_id: parse_column(&row.get::<String>(2)?, "sync_queue.record_id")?,
        payload: parse_payload(&row.get::<String>(3)?)?,
        enqueued_at: row.get(4)?,
        retry_count: to_u32(row.get(5)?, "sync_queue.retry_count")?,
        last_error: row.get(6)?,
    })
}

/// `id, record_type, record_id, payload, enqueued_at, retry_count, last_error, failed_at`
pub fn failed_item(row: &Row) -> Result<FailedSyncItem> {
    Ok(FailedSyncItem {
        id: row.get(0)?,
        record_type: parse_column(&row.get::<String>(1)?, "sync_failed_items.record_type")?,
        record_id: parse_column(&row.get::<String>(2)?, "sync_failed_items.record_id")?,
        payload: parse_payload(&row.get::<String>(3)?)?,
        enqueued_at: row.get(4)?,
        retry_count: to_u32(row.get(5)?, "sync_failed_items.retry_count")?,
        last_error: row.get(6)?,
        failed_at: row.get(7)?,
    })
}

/// `id, worker_id, shift_id, last_activity_at, inactive_minutes, action, by_whom, notes, created_at`
pub fn inactivity_entry(row: &Row) -> Result<InactivityLogEntry> {
    let shift_id = row
        .get::<Option<String>>(2)?
        .map(|raw| parse_column(&raw, "inactivity_logs.shift_id"))
        .transpose()?;

    Ok(InactivityLogEntry {
        id: row.get(0)?,
        worker_id: parse_column(&row.get::<String>(1)?, "inactivity_logs.worker_id")?,
        shift_id,
        last_activity_at: row.get(3)?,
        inactive_minutes: row.get(4)?,
        action: parse_column(&row.get::<String>(5)?, "inactivity_logs.action")?,
        by_whom: parse_column(&row.get::<String>(6)?, "inactivity_logs.by_whom")?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Convert a count into the integer type `SQLite` stores.
pub fn sql_int(value: u32) -> i64 {
    i64::from(value)
}
