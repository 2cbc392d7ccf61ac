//! Shared database service wrapper used by the background loops and the CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libsql::Connection;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::db::{
    Database, InactivityLogRepository, LibSqlInactivityLogRepository, LibSqlSyncQueueRepository,
    LibSqlWorkforceRepository, SyncQueueRepository, WorkforceRepository,
};
use crate::models::{
    FailedSyncItem, InactivityLogDraft, InactivityLogEntry, RecordId, RecordType, Shift, ShiftId,
    ShiftStorage, SyncQueueItem, SyncRunLog, SyncRunStats, WorkRecord, Worker, WorkerId,
    WorkerRole,
};
use crate::{Error, Result};

/// Thread-safe service for DB and repository operations.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::debug!("Opened database at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem location, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run raw SQL, used by tests to break the schema underneath a service.
    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(sql, ()).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Workers
    // -----------------------------------------------------------------------

    /// Create a worker account.
    pub async fn create_worker(
        &self,
        name: &str,
        role: WorkerRole,
        phone: Option<String>,
        push_token: Option<String>,
    ) -> Result<Worker> {
        let worker = Worker::new(name, role, phone, push_token)?;
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.create_worker(&worker).await?;
        Ok(worker)
    }

    pub async fn get_worker(&self, id: &WorkerId) -> Result<Option<Worker>> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.get_worker(id).await
    }

    /// Delete a worker account. Open shifts are left in place.
    pub async fn delete_worker(&self, id: &WorkerId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        if repo.delete_worker(id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("worker {id}")))
        }
    }

    pub async fn list_workers(&self) -> Result<Vec<Worker>> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.list_workers().await
    }

    /// Accounts that receive inactivity escalations.
    pub async fn list_supervisors(&self) -> Result<Vec<Worker>> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.list_supervisors().await
    }

    // -----------------------------------------------------------------------
    // Shifts and activity
    // -----------------------------------------------------------------------

    /// Open a shift for an existing worker.
    pub async fn clock_in(
        &self,
        worker_id: &WorkerId,
        at: i64,
        storage: ShiftStorage,
    ) -> Result<Shift> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        if repo.get_worker(worker_id).await?.is_none() {
            return Err(Error::NotFound(format!("worker {worker_id}")));
        }
        repo.clock_in(worker_id, at, storage).await
    }

    /// Close the worker's open shift.
    pub async fn clock_out(&self, worker_id: &WorkerId, at: i64) -> Result<Shift> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        let shift = repo
            .open_shift_for_worker(worker_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("open shift for worker {worker_id}")))?;
        repo.close_shift(&shift.id, at).await
    }

    /// Close a shift by id wherever it resides.
    pub async fn close_shift(&self, id: &ShiftId, at: i64) -> Result<Shift> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.close_shift(id, at).await
    }

    /// Record that the worker left the work session without clocking out.
    pub async fn exit_session(&self, worker_id: &WorkerId, at: i64) -> Result<Shift> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        let shift = repo
            .open_shift_for_worker(worker_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("open shift for worker {worker_id}")))?;
        repo.mark_session_exited(&shift.id, at).await
    }

    pub async fn get_shift(&self, id: &ShiftId) -> Result<Option<Shift>> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.get_shift(id).await
    }

    pub async fn open_shift_for_worker(&self, worker_id: &WorkerId) -> Result<Option<Shift>> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.open_shift_for_worker(worker_id).await
    }

    /// All open shifts across both stores.
    pub async fn list_open_shifts(&self) -> Result<Vec<Shift>> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.list_open_shifts().await
    }

    pub async fn record_heartbeat(&self, worker_id: &WorkerId, at: i64) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.record_heartbeat(worker_id, at).await
    }

    /// Latest heartbeat and latest work record at or after `since`.
    pub async fn latest_activity_since(
        &self,
        worker_id: &WorkerId,
        since: i64,
    ) -> Result<(Option<i64>, Option<i64>)> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        let heartbeat = repo.latest_heartbeat_since(worker_id, since).await?;
        let record = repo.latest_record_since(worker_id, since).await?;
        Ok((heartbeat, record))
    }

    // -----------------------------------------------------------------------
    // Work records
    // -----------------------------------------------------------------------

    /// Store a new work record and append it to the sync queue.
    pub async fn submit_record(
        &self,
        record_type: RecordType,
        worker_id: &WorkerId,
        payload: Value,
        at: i64,
    ) -> Result<(WorkRecord, SyncQueueItem)> {
        let record = WorkRecord::new(record_type, *worker_id, payload, at)?;

        let db = self.db.lock().await;
        let workforce = LibSqlWorkforceRepository::new(db.connection());
        if workforce.get_worker(worker_id).await?.is_none() {
            return Err(Error::NotFound(format!("worker {worker_id}")));
        }

        let conn = db.connection();
        conn.execute("BEGIN TRANSACTION", ()).await?;
        let item = match store_and_enqueue(conn, &record, at).await {
            Ok(item) => item,
            Err(e) => {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
        };
        if let Err(e) = conn.execute("COMMIT", ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
        Ok((record, item))
    }

    pub async fn get_record(&self, id: &RecordId) -> Result<Option<WorkRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.get_record(id).await
    }

    /// List work records, newest first.
    pub async fn list_records(&self, limit: usize) -> Result<Vec<WorkRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.list_records(limit).await
    }

    pub async fn mark_record_delivered(
        &self,
        id: &RecordId,
        remote_id: Option<&str>,
        at: i64,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.mark_record_delivered(id, remote_id, at).await
    }

    pub async fn mark_record_duplicate(
        &self,
        id: &RecordId,
        existing_id: Option<&str>,
        at: i64,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.mark_record_duplicate(id, existing_id, at).await
    }

    pub async fn mark_record_error(&self, id: &RecordId, message: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        repo.mark_record_error(id, message).await
    }

    // -----------------------------------------------------------------------
    // Sync queue
    // -----------------------------------------------------------------------

    /// Pending queue items in enqueue order.
    pub async fn list_pending(&self) -> Result<Vec<SyncQueueItem>> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncQueueRepository::new(db.connection());
        repo.list_pending().await
    }

    pub async fn record_failed_attempt(
        &self,
        id: i64,
        retry_count: u32,
        error: &str,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncQueueRepository::new(db.connection());
        repo.record_failed_attempt(id, retry_count, error).await
    }

    pub async fn remove_queue_item(&self, id: i64) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncQueueRepository::new(db.connection());
        repo.remove(id).await
    }

    pub async fn move_to_failed(
        &self,
        item: &SyncQueueItem,
        error: &str,
        at: i64,
    ) -> Result<FailedSyncItem> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncQueueRepository::new(db.connection());
        repo.move_to_failed(item, error, at).await
    }

    /// Permanently failed items, most recent first.
    pub async fn list_failed(&self, limit: usize) -> Result<Vec<FailedSyncItem>> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncQueueRepository::new(db.connection());
        repo.list_failed(limit).await
    }

    pub async fn append_sync_run(
        &self,
        started_at: i64,
        finished_at: i64,
        stats: SyncRunStats,
    ) -> Result<SyncRunLog> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncQueueRepository::new(db.connection());
        repo.append_run(started_at, finished_at, stats).await
    }

    /// Recent queue passes, most recent first.
    pub async fn list_sync_runs(&self, limit: usize) -> Result<Vec<SyncRunLog>> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncQueueRepository::new(db.connection());
        repo.list_runs(limit).await
    }

    // -----------------------------------------------------------------------
    // Inactivity log
    // -----------------------------------------------------------------------

    pub async fn append_inactivity_log(
        &self,
        draft: &InactivityLogDraft,
        at: i64,
    ) -> Result<InactivityLogEntry> {
        let db = self.db.lock().await;
        let repo = LibSqlInactivityLogRepository::new(db.connection());
        repo.append(draft, at).await
    }

    /// Recent inactivity log entries, optionally for one worker.
    pub async fn list_inactivity_log(
        &self,
        worker_id: Option<&WorkerId>,
        limit: usize,
    ) -> Result<Vec<InactivityLogEntry>> {
        let db = self.db.lock().await;
        let repo = LibSqlInactivityLogRepository::new(db.connection());
        match worker_id {
            Some(worker_id) => repo.list_for_worker(worker_id, limit).await,
            None => repo.list_recent(limit).await,
        }
    }
}

/// Both inserts of a submission; the caller owns the transaction.
async fn store_and_enqueue(
    conn: &Connection,
    record: &WorkRecord,
    at: i64,
) -> Result<SyncQueueItem> {
    LibSqlWorkforceRepository::new(conn).create_record(record).await?;
    LibSqlSyncQueueRepository::new(conn).enqueue(record, at).await
}
