use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crewsync_core::config::AppConfig;
use crewsync_core::{RecordType, WorkerRole};
use pretty_assertions::assert_eq;

use crate::cli::{CompletionShell, RoleArg};
use crate::commands::common::{
    format_timestamp, normalize_reason, open_database, parse_payload, parse_shift_id,
    parse_worker_id, resolve_config_path, resolve_db_path,
};
use crate::commands::completions::render_completions;
use crate::commands::config::run_config_init;
use crate::commands::inactive::scan_inactive;
use crate::commands::record::submit_record;
use crate::commands::worker::add_worker;
use crate::error::CliError;

#[test]
fn parse_worker_id_accepts_uuid_and_rejects_garbage() {
    let id = "0190a3f2-8c4e-7b1a-9d2e-3f4a5b6c7d8e";
    assert_eq!(parse_worker_id(&format!("  {id} ")).unwrap().to_string(), id);
    assert!(matches!(
        parse_worker_id("not-an-id"),
        Err(CliError::InvalidId { kind: "worker", .. })
    ));
    assert!(matches!(
        parse_shift_id(""),
        Err(CliError::InvalidId { kind: "shift", .. })
    ));
}

#[test]
fn parse_payload_requires_object() {
    let payload = parse_payload(r#"{"first_name":"Dana","phone":"555-0100"}"#).unwrap();
    assert_eq!(payload["first_name"], "Dana");
    assert!(matches!(
        parse_payload("[1, 2]"),
        Err(CliError::PayloadNotObject)
    ));
    assert!(matches!(
        parse_payload("{oops"),
        Err(CliError::Serialization(_))
    ));
}

#[test]
fn normalize_reason_trims_and_rejects_empty() {
    assert_eq!(normalize_reason("  left site ").unwrap(), "left site");
    assert!(matches!(normalize_reason(" \n "), Err(CliError::EmptyReason)));
}

#[test]
fn explicit_paths_win_over_defaults() {
    let db_path = PathBuf::from("/tmp/custom.db");
    assert_eq!(resolve_db_path(Some(db_path.clone())), db_path);

    let config_path = PathBuf::from("/tmp/custom.json");
    assert_eq!(resolve_config_path(Some(config_path.clone())), config_path);
}

#[test]
fn role_arg_maps_to_worker_role() {
    assert_eq!(WorkerRole::from(RoleArg::Supervisor), WorkerRole::Supervisor);
    assert_eq!(WorkerRole::from(RoleArg::Admin), WorkerRole::Admin);
    assert_eq!(WorkerRole::from(RoleArg::Worker), WorkerRole::Worker);
}

#[test]
fn format_timestamp_renders_utc_minutes() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00");
    assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
}

#[test]
fn completions_mention_binary_name() {
    for shell in [
        CompletionShell::Bash,
        CompletionShell::Zsh,
        CompletionShell::Fish,
    ] {
        let script = String::from_utf8(render_completions(shell)).unwrap();
        assert!(script.contains("crewsync"), "{shell:?} completions");
    }
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let path = unique_test_path("config", "json");

    run_config_init(false, &path).unwrap();
    let written = AppConfig::load_from_path(&path).unwrap();
    assert_eq!(written, AppConfig::default());

    assert!(matches!(
        run_config_init(false, &path),
        Err(CliError::Config(_))
    ));
    run_config_init(true, &path).unwrap();

    let _ = std::fs::remove_file(&path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn submitted_record_is_queued_for_delivery() {
    let db_path = unique_test_path("record", "db");
    let worker = add_worker("Dana", WorkerRole::Worker, None, None, &db_path)
        .await
        .unwrap();

    let record = submit_record(
        RecordType::Survey,
        &worker.id.to_string(),
        r#"{"first_name":"Dana","last_name":"Reyes","phone":"(555) 010-0100"}"#,
        &db_path,
    )
    .await
    .unwrap();

    let db = open_database(&db_path).await.unwrap();
    let pending = db.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].record_id, record.id);
    assert_eq!(pending[0].retry_count, 0);
    drop(db);

    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn submit_record_rejects_unknown_worker() {
    let db_path = unique_test_path("unknown-worker", "db");

    let result = submit_record(
        RecordType::Appointment,
        "0190a3f2-8c4e-7b1a-9d2e-3f4a5b6c7d8e",
        r#"{"subject":"Roof estimate"}"#,
        &db_path,
    )
    .await;
    assert!(matches!(
        result,
        Err(CliError::Core(crewsync_core::Error::NotFound(_)))
    ));

    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn scan_flags_clocked_in_worker_past_zero_threshold() {
    let db_path = unique_test_path("scan", "db");
    let worker = add_worker(
        "Ari",
        WorkerRole::Worker,
        Some(" +15550100003 ".to_string()),
        Some("   ".to_string()),
        &db_path,
    )
    .await
    .unwrap();
    assert_eq!(worker.phone.as_deref(), Some("+15550100003"));
    assert_eq!(worker.push_token, None);

    {
        let db = open_database(&db_path).await.unwrap();
        db.clock_in(
            &worker.id,
            crewsync_core::util::now_ms(),
            crewsync_core::models::ShiftStorage::LocalOnly,
        )
        .await
        .unwrap();
    }

    let flagged = scan_inactive(0, &db_path).await.unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].worker_id, worker.id);

    let quiet = scan_inactive(60, &db_path).await.unwrap();
    assert!(quiet.is_empty());

    cleanup_db_files(&db_path);
}

fn unique_test_path(label: &str, extension: &str) -> PathBuf {
    static NEXT_TEST_FILE_ID: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let sequence = NEXT_TEST_FILE_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "crewsync-cli-{label}-test-{timestamp}-{sequence}.{extension}"
    ))
}

fn cleanup_db_files(path: &PathBuf) {
    // On Windows, libsql can keep file handles alive briefly after drop.
    if cfg!(windows) {
        return;
    }
    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
}
