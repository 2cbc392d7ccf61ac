//! Durable sync queue, permanent-failure log and run statistics

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{FailedSyncItem, SyncQueueItem, SyncRunLog, SyncRunStats, WorkRecord};

use super::decode::{self, sql_int};

const QUEUE_COLUMNS: &str =
    "id, record_type, record_id, payload, enqueued_at, retry_count, last_error";
const FAILED_COLUMNS: &str =
    "id, record_type, record_id, payload, enqueued_at, retry_count, last_error, failed_at";

/// Trait for sync queue storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SyncQueueRepository {
    /// Append a record to the end of the queue
    async fn enqueue(&self, record: &WorkRecord, at: i64) -> Result<SyncQueueItem>;

    /// Pending items in enqueue order
    async fn list_pending(&self) -> Result<Vec<SyncQueueItem>>;

    /// Persist a failed attempt that keeps the item queued
    async fn record_failed_attempt(&self, id: i64, retry_count: u32, error: &str) -> Result<()>;

    /// Remove a delivered item
    async fn remove(&self, id: i64) -> Result<()>;

    /// Move an exhausted item to the permanent-failure log and drop it from the queue
    async fn move_to_failed(
        &self,
        item: &SyncQueueItem,
        error: &str,
        at: i64,
    ) -> Result<FailedSyncItem>;

    /// Permanently failed items, most recent first
    async fn list_failed(&self, limit: usize) -> Result<Vec<FailedSyncItem>>;

    /// Append one pass to the delivery-statistics log
    async fn append_run(&self, started_at: i64, finished_at: i64, stats: SyncRunStats)
        -> Result<SyncRunLog>;

    /// Recent passes, most recent first
    async fn list_runs(&self, limit: usize) -> Result<Vec<SyncRunLog>>;
}

/// libSQL implementation of `SyncQueueRepository`
pub struct LibSqlSyncQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn write_failed(&self, failed: &FailedSyncItem) -> Result<()> {
        let payload = serde_json::to_string(&failed.payload)?;
        self.conn
            .execute(
                "INSERT INTO sync_failed_items (id, record_type, record_id, payload, enqueued_at, retry_count, last_error, failed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    failed.id,
                    failed.record_type.as_str(),
                    failed.record_id.as_str(),
                    payload,
                    failed.enqueued_at,
                    sql_int(failed.retry_count),
                    failed.last_error.as_str(),
                    failed.failed_at
                ],
            )
            .await?;
        self.conn
            .execute("DELETE FROM sync_queue WHERE id = ?", params![failed.id])
            .await?;
        Ok(())
    }
}

impl SyncQueueRepository for LibSqlSyncQueueRepository<'_> {
    async fn enqueue(&self, record: &WorkRecord, at: i64) -> Result<SyncQueueItem> {
        let payload = serde_json::to_string(&record.payload)?;
        self.conn
            .execute(
                "INSERT INTO sync_queue (record_type, record_id, payload, enqueued_at, retry_count) VALUES (?, ?, ?, ?, 0)",
                params![
                    record.record_type.as_str(),
                    record.id.as_str(),
                    payload,
                    at
                ],
            )
            .await?;

        Ok(SyncQueueItem {
            id: self.conn.last_insert_rowid(),
            record_type: record.record_type,
            record_id: record.id,
            payload: record.payload.clone(),
            enqueued_at: at,
            retry_count: 0,
            last_error: None,
        })
    }

    async fn list_pending(&self) -> Result<Vec<SyncQueueItem>> {
        let sql = format!("SELECT {QUEUE_COLUMNS} FROM sync_queue ORDER BY id ASC");
        let mut rows = self.conn.query(&sql, ()).await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(decode::queue_item(&row)?);
        }
        Ok(items)
    }

    async fn record_failed_attempt(&self, id: i64, retry_count: u32, error: &str) -> Result<()> {
        let updated = self
            .conn
            .execute(
                // retry_count never decreases
                "UPDATE sync_queue SET retry_count = MAX(retry_count, ?), last_error = ? WHERE id = ?",
                params![sql_int(retry_count), error, id],
            )
            .await?;

        if updated == 0 {
            return Err(Error::NotFound(format!("sync queue item {id}")));
        }
        Ok(())
    }

    async fn remove(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_queue WHERE id = ?", params![id])
            .await?;
        Ok(())
    }

    async fn move_to_failed(
        &self,
        item: &SyncQueueItem,
        error: &str,
        at: i64,
    ) -> Result<FailedSyncItem> {
        let failed = FailedSyncItem {
            id: item.id,
            record_type: item.record_type,
            record_id: item.record_id,
            payload: item.payload.clone(),
            enqueued_at: item.enqueued_at,
            retry_count: item.retry_count,
            last_error: error.to_string(),
            failed_at: at,
        };

        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        if let Err(e) = self.write_failed(&failed).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(failed)
    }

    async fn list_failed(&self, limit: usize) -> Result<Vec<FailedSyncItem>> {
        let sql = format!(
            "SELECT {FAILED_COLUMNS} FROM sync_failed_items ORDER BY failed_at DESC, id DESC LIMIT ?"
        );
        let mut rows = self.conn.query(&sql, params![limit as i64]).await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(decode::failed_item(&row)?);
        }
        Ok(items)
    }

    async fn append_run(
        &self,
        started_at: i64,
        finished_at: i64,
        stats: SyncRunStats,
    ) -> Result<SyncRunLog> {
        self.conn
            .execute(
                "INSERT INTO sync_runs (started_at, finished_at, delivered, duplicates, failed, retried) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    started_at,
                    finished_at,
                    sql_int(stats.delivered),
                    sql_int(stats.duplicates),
                    sql_int(stats.failed),
                    sql_int(stats.retried)
                ],
            )
            .await?;

        Ok(SyncRunLog {
            id: self.conn.last_insert_rowid(),
            started_at,
            finished_at,
            stats,
        })
    }

    async fn list_runs(&self, limit: usize) -> Result<Vec<SyncRunLog>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, started_at, finished_at, delivered, duplicates, failed, retried
                 FROM sync_runs ORDER BY finished_at DESC, id DESC LIMIT ?",
                params![limit as i64],
            )
            .await?;

        let mut runs = Vec::new();
        while let Some(row) = rows.next().await? {
            let count = |idx: i32| -> Result<u32> {
                let value: i64 = row.get(idx)?;
                u32::try_from(value)
                    .map_err(|_| Error::Database(format!("Invalid run count: {value}")))
            };
            runs.push(SyncRunLog {
                id: row.get(0)?,
                started_at: row.get(1)?,
                finished_at: row.get(2)?,
                stats: SyncRunStats {
                    delivered: count(3)?,
                    duplicates: count(4)?,
                    failed: count(5)?,
                    retried: count(6)?,
                },
            });
        }
        Ok(runs)
    }
}
