//! Workforce repository: workers, shifts, heartbeats and work records

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{
    RecordId, Shift, ShiftId, ShiftStorage, WorkRecord, Worker, WorkerId, WorkerRole,
};

use super::decode;

const WORKER_COLUMNS: &str = "id, name, role, phone, push_token, created_at";
const SHIFT_COLUMNS: &str = "id, worker_id, clock_in_at, clock_out_at, session_exited_at";
const RECORD_COLUMNS: &str =
    "id, record_type, worker_id, payload, created_at, synced, remote_id, sync_error, needs_review, synced_at";

/// Shift stores in lookup order: the remote mirror first, then local-only rows.
const SHIFT_STORES: [ShiftStorage; 2] = [ShiftStorage::Remote, ShiftStorage::LocalOnly];

const fn shift_table(storage: ShiftStorage) -> &'static str {
    match storage {
        ShiftStorage::Remote => "shifts",
        ShiftStorage::LocalOnly => "local_shifts",
    }
}

/// Trait for worker, shift and work record storage operations (async)
#[allow(async_fn_in_trait)]
pub trait WorkforceRepository {
    /// Insert a worker account
    async fn create_worker(&self, worker: &Worker) -> Result<()>;

    /// Get a worker by ID
    async fn get_worker(&self, id: &WorkerId) -> Result<Option<Worker>>;

    /// Delete a worker account; returns false when it did not exist
    async fn delete_worker(&self, id: &WorkerId) -> Result<bool>;

    /// List all workers by name
    async fn list_workers(&self) -> Result<Vec<Worker>>;

    /// List accounts that receive inactivity escalations
    async fn list_supervisors(&self) -> Result<Vec<Worker>>;

    /// Open a shift; fails when the worker already has an open shift in either store
    async fn clock_in(&self, worker_id: &WorkerId, at: i64, storage: ShiftStorage)
        -> Result<Shift>;

    /// Get a shift from whichever store holds it
    async fn get_shift(&self, id: &ShiftId) -> Result<Option<Shift>>;

    /// The worker's open shift, if any
    async fn open_shift_for_worker(&self, worker_id: &WorkerId) -> Result<Option<Shift>>;

    /// All open shifts across both stores, oldest clock-in first
    async fn list_open_shifts(&self) -> Result<Vec<Shift>>;

    /// Close an open shift wherever it currently resides
    async fn close_shift(&self, id: &ShiftId, at: i64) -> Result<Shift>;

    /// Mark that the worker left the work session of an open shift
    async fn mark_session_exited(&self, id: &ShiftId, at: i64) -> Result<Shift>;

    /// Record a heartbeat
    async fn record_heartbeat(&self, worker_id: &WorkerId, at: i64) -> Result<()>;

    /// Latest heartbeat at or after `since`
    async fn latest_heartbeat_since(&self, worker_id: &WorkerId, since: i64)
        -> Result<Option<i64>>;

    /// Insert a work record
    async fn create_record(&self, record: &WorkRecord) -> Result<()>;

    /// Get a work record by ID
    async fn get_record(&self, id: &RecordId) -> Result<Option<WorkRecord>>;

    /// List work records, newest first
    async fn list_records(&self, limit: usize) -> Result<Vec<WorkRecord>>;

    /// Creation time of the worker's latest record at or after `since`
    async fn latest_record_since(&self, worker_id: &WorkerId, since: i64) -> Result<Option<i64>>;

    /// Mark a record delivered; returns false when the record does not exist
    async fn mark_record_delivered(
        &self,
        id: &RecordId,
        remote_id: Option<&str>,
        at: i64,
    ) -> Result<bool>;

    /// Mark a record as a remote duplicate awaiting review
    async fn mark_record_duplicate(
        &self,
        id: &RecordId,
        existing_id: Option<&str>,
        at: i64,
    ) -> Result<bool>;

    /// Store the latest delivery error on a record
    async fn mark_record_error(&self, id: &RecordId, message: &str) -> Result<bool>;
}

/// libSQL implementation of `WorkforceRepository`
pub struct LibSqlWorkforceRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlWorkforceRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn get_shift_in(&self, id: &ShiftId, storage: ShiftStorage) -> Result<Option<Shift>> {
        let sql = format!(
            "SELECT {SHIFT_COLUMNS} FROM {} WHERE id = ?",
            shift_table(storage)
        );
        let mut rows = self.conn.query(&sql, params![id.as_str()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(decode::shift(&row, storage)?)),
            None => Ok(None),
        }
    }

    async fn open_shifts_in(&self, storage: ShiftStorage) -> Result<Vec<Shift>> {
        let sql = format!(
            "SELECT {SHIFT_COLUMNS} FROM {} WHERE clock_out_at IS NULL ORDER BY clock_in_at ASC",
            shift_table(storage)
        );
        let mut rows = self.conn.query(&sql, ()).await?;

        let mut shifts = Vec::new();
        while let Some(row) = rows.next().await? {
            shifts.push(decode::shift(&row, storage)?);
        }
        Ok(shifts)
    }

    async fn query_workers(&self, sql: &str) -> Result<Vec<Worker>> {
        let mut rows = self.conn.query(sql, ()).await?;

        let mut workers = Vec::new();
        while let Some(row) = rows.next().await? {
            workers.push(decode::worker(&row)?);
        }
        Ok(workers)
    }

    /// Locate an open shift for an update, reporting why it cannot be updated.
    async fn require_open_shift(&self, id: &ShiftId) -> Result<Shift> {
        let shift = self
            .get_shift(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("shift {id}")))?;

        if !shift.is_open() {
            return Err(Error::InvalidInput(format!("Shift {id} is already closed")));
        }
        Ok(shift)
    }
}

impl WorkforceRepository for LibSqlWorkforceRepository<'_> {
    async fn create_worker(&self, worker: &Worker) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO workers (id, name, role, phone, push_token, created_at) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    worker.id.as_str(),
                    worker.name.as_str(),
                    worker.role.as_str(),
                    worker.phone.clone(),
                    worker.push_token.clone(),
                    worker.created_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_worker(&self, id: &WorkerId) -> Result<Option<Worker>> {
        let sql = format!("SELECT {WORKER_COLUMNS} FROM workers WHERE id = ?");
        let mut rows = self.conn.query(&sql, params![id.as_str()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(decode::worker(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete_worker(&self, id: &WorkerId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM workers WHERE id = ?", params![id.as_str()])
            .await?;
        Ok(deleted > 0)
    }

    async fn list_workers(&self) -> Result<Vec<Worker>> {
        let sql = format!("SELECT {WORKER_COLUMNS} FROM workers ORDER BY name ASC");
        self.query_workers(&sql).await
    }

    async fn list_supervisors(&self) -> Result<Vec<Worker>> {
        let sql = format!(
            "SELECT {WORKER_COLUMNS} FROM workers WHERE role IN ('{}', '{}') ORDER BY name ASC",
            WorkerRole::Supervisor.as_str(),
            WorkerRole::Admin.as_str()
        );
        self.query_workers(&sql).await
    }

    async fn clock_in(
        &self,
        worker_id: &WorkerId,
        at: i64,
        storage: ShiftStorage,
    ) -> Result<Shift> {
        if self.open_shift_for_worker(worker_id).await?.is_some() {
            return Err(Error::ShiftAlreadyOpen(worker_id.to_string()));
        }

        let shift = Shift::open(*worker_id, at, storage);
        let sql = format!(
            "INSERT INTO {} (id, worker_id, clock_in_at) VALUES (?, ?, ?)",
            shift_table(storage)
        );
        self.conn
            .execute(
                &sql,
                params![shift.id.as_str(), worker_id.as_str(), shift.clock_in_at],
            )
            .await?;

        Ok(shift)
    }

    async fn get_shift(&self, id: &ShiftId) -> Result<Option<Shift>> {
        for storage in SHIFT_STORES {
            if let Some(shift) = self.get_shift_in(id, storage).await? {
                return Ok(Some(shift));
            }
        }
        Ok(None)
    }

    async fn open_shift_for_worker(&self, worker_id: &WorkerId) -> Result<Option<Shift>> {
        for storage in SHIFT_STORES {
            let sql = format!(
                "SELECT {SHIFT_COLUMNS} FROM {} WHERE worker_id = ? AND clock_out_at IS NULL LIMIT 1",
                shift_table(storage)
            );
            let mut rows = self.conn.query(&sql, params![worker_id.as_str()]).await?;
            if let Some(row) = rows.next().await? {
                return Ok(Some(decode::shift(&row, storage)?));
            }
        }
        Ok(None)
    }

    async fn list_open_shifts(&self) -> Result<Vec<Shift>> {
        let mut shifts = Vec::new();
        for storage in SHIFT_STORES {
            shifts.extend(self.open_shifts_in(storage).await?);
        }
        shifts.sort_by_key(|shift| shift.clock_in_at);
        Ok(shifts)
    }

    async fn close_shift(&self, id: &ShiftId, at: i64) -> Result<Shift> {
        let mut shift = self.require_open_shift(id).await?;

        let sql = format!(
            "UPDATE {} SET clock_out_at = ? WHERE id = ? AND clock_out_at IS NULL",
            shift_table(shift.storage)
        );
        let updated = self.conn.execute(&sql, params![at, id.as_str()]).await?;
        if updated == 0 {
            return Err(Error::InvalidInput(format!("Shift {id} is already closed")));
        }

        tracing::debug!("Closed shift {id} in {} storage", shift.storage);
        shift.clock_out_at = Some(at);
        Ok(shift)
    }

    async fn mark_session_exited(&self, id: &ShiftId, at: i64) -> Result<Shift> {
        let mut shift = self.require_open_shift(id).await?;

        let sql = format!(
            "UPDATE {} SET session_exited_at = ? WHERE id = ?",
            shift_table(shift.storage)
        );
        self.conn.execute(&sql, params![at, id.as_str()]).await?;

        shift.session_exited_at = Some(at);
        Ok(shift)
    }

    async fn record_heartbeat(&self, worker_id: &WorkerId, at: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO heartbeats (worker_id, observed_at) VALUES (?, ?)",
                params![worker_id.as_str(), at],
            )
            .await?;
        Ok(())
    }

    async fn latest_heartbeat_since(
        &self,
        worker_id: &WorkerId,
        since: i64,
    ) -> Result<Option<i64>> {
        let mut rows = self
            .conn
            .query(
                "SELECT MAX(observed_at) FROM heartbeats WHERE worker_id = ? AND observed_at >= ?",
                params![worker_id.as_str(), since],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<Option<i64>>(0)?),
            None => Ok(None),
        }
    }

    async fn create_record(&self, record: &WorkRecord) -> Result<()> {
        let payload = serde_json::to_string(&record.payload)?;
        self.conn
            .execute(
                "INSERT INTO work_records (id, record_type, worker_id, payload, created_at, synced, remote_id, sync_error, needs_review, synced_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.id.as_str(),
                    record.record_type.as_str(),
                    record.worker_id.as_str(),
                    payload,
                    record.created_at,
                    i32::from(record.synced),
                    record.remote_id.clone(),
                    record.sync_error.clone(),
                    i32::from(record.needs_review),
                    record.synced_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<WorkRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM work_records WHERE id = ?");
        let mut rows = self.conn.query(&sql, params![id.as_str()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(decode::work_record(&row)?)),
            None => Ok(None),
        }
    }

    #[allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT
    async fn list_records(&self, limit: usize) -> Result<Vec<WorkRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM work_records ORDER BY created_at DESC LIMIT ?"
        );
        let mut rows = self.conn.query(&sql, params![limit as i64]).await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(decode::work_record(&row)?);
        }
        Ok(records)
    }

    async fn latest_record_since(&self, worker_id: &WorkerId, since: i64) -> Result<Option<i64>> {
        let mut rows = self
            .conn
            .query(
                "SELECT MAX(created_at) FROM work_records WHERE worker_id = ? AND created_at >= ?",
                params![worker_id.as_str(), since],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<Option<i64>>(0)?),
            None => Ok(None),
        }
    }

    async fn mark_record_delivered(
        &self,
        id: &RecordId,
        remote_id: Option<&str>,
        at: i64,
    ) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE work_records
                 SET synced = 1, remote_id = COALESCE(?, remote_id), sync_error = NULL, synced_at = ?
                 WHERE id = ?",
                params![remote_id, at, id.as_str()],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn mark_record_duplicate(
        &self,
        id: &RecordId,
        existing_id: Option<&str>,
        at: i64,
    ) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE work_records
                 SET synced = 1, needs_review = 1, remote_id = COALESCE(?, remote_id), sync_error = NULL, synced_at = ?
                 WHERE id = ?",
                params![existing_id, at, id.as_str()],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn mark_record_error(&self, id: &RecordId, message: &str) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE work_records SET sync_error = ? WHERE id = ?",
                params![message, id.as_str()],
            )
            .await?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn add_worker(
        repo: &LibSqlWorkforceRepository<'_>,
        name: &str,
        role: WorkerRole,
    ) -> Worker {
        let worker = Worker::new(name, role, Some("555-0100".to_string()), None).unwrap();
        repo.create_worker(&worker).await.unwrap();
        worker
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_get_worker() {
        let db = setup().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());

        let worker = add_worker(&repo, "Ana", WorkerRole::Worker).await;
        let fetched = repo.get_worker(&worker.id).await.unwrap().unwrap();
        assert_eq!(fetched, worker);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_supervisors_includes_admins() {
        let db = setup().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());

        add_worker(&repo, "Ana", WorkerRole::Worker).await;
        add_worker(&repo, "Ben", WorkerRole::Supervisor).await;
        add_worker(&repo, "Cy", WorkerRole::Admin).await;

        let names = repo
            .list_supervisors()
            .await
            .unwrap()
            .into_iter()
            .map(|worker| worker.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Ben", "Cy"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_single_open_shift_across_stores() {
        let db = setup().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        let worker = add_worker(&repo, "Ana", WorkerRole::Worker).await;

        repo.clock_in(&worker.id, 1_000, ShiftStorage::LocalOnly)
            .await
            .unwrap();
        let error = repo
            .clock_in(&worker.id, 2_000, ShiftStorage::Remote)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::ShiftAlreadyOpen(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_close_shift_finds_local_only_rows() {
        let db = setup().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        let worker = add_worker(&repo, "Ana", WorkerRole::Worker).await;

        let shift = repo
            .clock_in(&worker.id, 1_000, ShiftStorage::LocalOnly)
            .await
            .unwrap();
        let closed = repo.close_shift(&shift.id, 5_000).await.unwrap();
        assert_eq!(closed.clock_out_at, Some(5_000));
        assert_eq!(closed.storage, ShiftStorage::LocalOnly);

        let stored = repo.get_shift(&shift.id).await.unwrap().unwrap();
        assert_eq!(stored.clock_out_at, Some(5_000));
        assert!(repo.list_open_shifts().await.unwrap().is_empty());

        // The worker may clock in again once the shift is closed
        repo.clock_in(&worker.id, 6_000, ShiftStorage::Remote)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_close_shift_errors() {
        let db = setup().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        let worker = add_worker(&repo, "Ana", WorkerRole::Worker).await;

        assert!(matches!(
            repo.close_shift(&ShiftId::new(), 1).await.unwrap_err(),
            Error::NotFound(_)
        ));

        let shift = repo
            .clock_in(&worker.id, 1_000, ShiftStorage::Remote)
            .await
            .unwrap();
        repo.close_shift(&shift.id, 2_000).await.unwrap();
        assert!(matches!(
            repo.close_shift(&shift.id, 3_000).await.unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_latest_activity_queries_respect_since() {
        let db = setup().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        let worker = add_worker(&repo, "Ana", WorkerRole::Worker).await;

        repo.record_heartbeat(&worker.id, 100).await.unwrap();
        repo.record_heartbeat(&worker.id, 300).await.unwrap();
        assert_eq!(
            repo.latest_heartbeat_since(&worker.id, 0).await.unwrap(),
            Some(300)
        );
        assert_eq!(
            repo.latest_heartbeat_since(&worker.id, 301).await.unwrap(),
            None
        );

        let record = WorkRecord::new(
            crate::models::RecordType::Survey,
            worker.id,
            serde_json::json!({ "phone": "555-0100" }),
            250,
        )
        .unwrap();
        repo.create_record(&record).await.unwrap();
        assert_eq!(
            repo.latest_record_since(&worker.id, 200).await.unwrap(),
            Some(250)
        );
        assert_eq!(repo.latest_record_since(&worker.id, 251).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_delivery_flags() {
        let db = setup().await;
        let repo = LibSqlWorkforceRepository::new(db.connection());
        let worker = add_worker(&repo, "Ana", WorkerRole::Worker).await;

        let record = WorkRecord::new(
            crate::models::RecordType::Survey,
            worker.id,
            serde_json::json!({ "phone": "555-0100" }),
            1,
        )
        .unwrap();
        repo.create_record(&record).await.unwrap();

        assert!(repo.mark_record_error(&record.id, "HTTP 503").await.unwrap());
        assert!(repo
            .mark_record_delivered(&record.id, Some("00Q1"), 10)
            .await
            .unwrap());

        let stored = repo.get_record(&record.id).await.unwrap().unwrap();
        assert!(stored.synced);
        assert_eq!(stored.remote_id.as_deref(), Some("00Q1"));
        assert_eq!(stored.sync_error, None);
        assert_eq!(stored.synced_at, Some(10));

        assert!(!repo
            .mark_record_delivered(&RecordId::new(), None, 10)
            .await
            .unwrap());
    }
}
