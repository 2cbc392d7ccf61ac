//! Inactivity audit trail repository

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{InactivityLogDraft, InactivityLogEntry, WorkerId};

use super::decode;

const ENTRY_COLUMNS: &str =
    "id, worker_id, shift_id, last_activity_at, inactive_minutes, action, by_whom, notes, created_at";

/// Trait for the append-only inactivity log (async)
#[allow(async_fn_in_trait)]
pub trait InactivityLogRepository {
    /// Append an entry
    async fn append(&self, draft: &InactivityLogDraft, at: i64) -> Result<InactivityLogEntry>;

    /// Most recent entries first
    async fn list_recent(&self, limit: usize) -> Result<Vec<InactivityLogEntry>>;

    /// Most recent entries for one worker first
    async fn list_for_worker(
        &self,
        worker_id: &WorkerId,
        limit: usize,
    ) -> Result<Vec<InactivityLogEntry>>;
}

/// libSQL implementation of `InactivityLogRepository`
pub struct LibSqlInactivityLogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlInactivityLogRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn collect(&self, mut rows: libsql::Rows) -> Result<Vec<InactivityLogEntry>> {
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(decode::inactivity_entry(&row)?);
        }
        Ok(entries)
    }
}

impl InactivityLogRepository for LibSqlInactivityLogRepository<'_> {
    async fn append(&self, draft: &InactivityLogDraft, at: i64) -> Result<InactivityLogEntry> {
        self.conn
            .execute(
                "INSERT INTO inactivity_logs (worker_id, shift_id, last_activity_at, inactive_minutes, action, by_whom, notes, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    draft.worker_id.as_str(),
                    draft.shift_id.map(|id| id.as_str()),
                    draft.last_activity_at,
                    draft.inactive_minutes,
                    draft.action.as_str(),
                    draft.by_whom.as_str(),
                    draft.notes.clone(),
                    at
                ],
            )
            .await?;

        Ok(InactivityLogEntry {
            id: self.conn.last_insert_rowid(),
            worker_id: draft.worker_id,
            shift_id: draft.shift_id,
            last_activity_at: draft.last_activity_at,
            inactive_minutes: draft.inactive_minutes,
            action: draft.action,
            by_whom: draft.by_whom,
            notes: draft.notes.clone(),
            created_at: at,
        })
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<InactivityLogEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM inactivity_logs ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let rows = self.conn.query(&sql, params![limit as i64]).await?;
        self.collect(rows).await
    }

    async fn list_for_worker(
        &self,
        worker_id: &WorkerId,
        limit: usize,
    ) -> Result<Vec<InactivityLogEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM inactivity_logs WHERE worker_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let rows = self
            .conn
            .query(&sql, params![worker_id.as_str(), limit as i64])
            .await?;
        self.collect(rows).await
    }
}
