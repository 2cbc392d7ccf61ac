//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        apply(conn, 1, &V1_WORKFORCE).await?;
    }
    if version < 2 {
        apply(conn, 2, &V2_SYNC_QUEUE).await?;
    }
    if version < 3 {
        apply(conn, 3, &V3_INACTIVITY_LOG).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Version 1: workers, shifts (remote mirror and local-only), heartbeats, work records
const V1_WORKFORCE: [&str; 12] = [
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS workers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        phone TEXT,
        push_token TEXT,
        created_at INTEGER NOT NULL
    )",
    // Remote attendance rows may reference workers this device has not seen yet,
    // so shifts carry no foreign key.
    "CREATE TABLE IF NOT EXISTS shifts (
        id TEXT PRIMARY KEY,
        worker_id TEXT NOT NULL,
        clock_in_at INTEGER NOT NULL,
        clock_out_at INTEGER,
        session_exited_at INTEGER
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_shifts_open_worker
        ON shifts(worker_id) WHERE clock_out_at IS NULL",
    "CREATE TABLE IF NOT EXISTS local_shifts (
        id TEXT PRIMARY KEY,
        worker_id TEXT NOT NULL,
        clock_in_at INTEGER NOT NULL,
        clock_out_at INTEGER,
        session_exited_at INTEGER
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_local_shifts_open_worker
        ON local_shifts(worker_id) WHERE clock_out_at IS NULL",
    "CREATE TABLE IF NOT EXISTS heartbeats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        worker_id TEXT NOT NULL,
        observed_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_heartbeats_worker ON heartbeats(worker_id, observed_at DESC)",
    "CREATE TABLE IF NOT EXISTS work_records (
        id TEXT PRIMARY KEY,
        record_type TEXT NOT NULL,
        worker_id TEXT NOT NULL,
        payload TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        synced INTEGER NOT NULL DEFAULT 0,
        remote_id TEXT,
        sync_error TEXT,
        needs_review INTEGER NOT NULL DEFAULT 0,
        synced_at INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_work_records_worker ON work_records(worker_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_work_records_synced ON work_records(synced)",
    "INSERT INTO schema_version (version) VALUES (1)",
];

/// Version 2: durable sync queue, permanent-failure log, run statistics
const V2_SYNC_QUEUE: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS sync_queue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        record_type TEXT NOT NULL,
        record_id TEXT NOT NULL,
        payload TEXT NOT NULL,
        enqueued_at INTEGER NOT NULL,
        retry_count INTEGER NOT NULL DEFAULT 0,
        last_error TEXT
    )",
    "CREATE TABLE IF NOT EXISTS sync_failed_items (
        id INTEGER PRIMARY KEY,
        record_type TEXT NOT NULL,
        record_id TEXT NOT NULL,
        payload TEXT NOT NULL,
        enqueued_at INTEGER NOT NULL,
        retry_count INTEGER NOT NULL,
        last_error TEXT NOT NULL,
        failed_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sync_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        started_at INTEGER NOT NULL,
        finished_at INTEGER NOT NULL,
        delivered INTEGER NOT NULL,
        duplicates INTEGER NOT NULL,
        failed INTEGER NOT NULL,
        retried INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sync_runs_finished ON sync_runs(finished_at DESC)",
    "INSERT INTO schema_version (version) VALUES (2)",
];

/// Version 3: inactivity audit trail
const V3_INACTIVITY_LOG: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS inactivity_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        worker_id TEXT NOT NULL,
        shift_id TEXT,
        last_activity_at INTEGER,
        inactive_minutes INTEGER,
        action TEXT NOT NULL,
        by_whom TEXT NOT NULL,
        notes TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_inactivity_logs_worker ON inactivity_logs(worker_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_inactivity_logs_created ON inactivity_logs(created_at DESC)",
    "INSERT INTO schema_version (version) VALUES (3)",
];

/// Apply one migration's statements inside a transaction.
///
/// libsql doesn't have `execute_batch`, so statements run one at a time.
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {version} (latest {CURRENT_VERSION})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = ?
                )",
                [name],
            )
            .await
            .unwrap();

        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_create_all_tables() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        for table in [
            "workers",
            "shifts",
            "local_shifts",
            "heartbeats",
            "work_records",
            "sync_queue",
            "sync_failed_items",
            "sync_runs",
            "inactivity_logs",
        ] {
            assert!(table_exists(&conn, table).await, "missing table {table}");
        }
    }
}
