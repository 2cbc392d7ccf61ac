use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crewsync_core::activity::InactivityService;
use crewsync_core::config::Credentials;
use crewsync_core::notify::GatewayNotifier;
use crewsync_core::sync::SyncService;

use crate::commands::common::{build_processor, load_config, open_database};
use crate::error::CliError;

/// Run both background services until Ctrl-C.
pub async fn run_services(db_path: &Path, config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let db = open_database(db_path).await?;

    let processor = build_processor(db.clone(), &config)?;
    let mut sync = SyncService::new(
        db.clone(),
        processor,
        Duration::from_secs(config.sync.interval_secs),
    );

    let notifier = GatewayNotifier::from_settings(&config.notifications, &Credentials::from_env())?;
    if !notifier.sms_enabled() {
        tracing::warn!("SMS escalation is disabled; only push notifications will be sent");
    }
    let mut inactivity = InactivityService::new(db, Arc::new(notifier), config.inactivity.clone());

    sync.start()?;
    inactivity.start()?;
    tracing::info!(
        "crewsync running (CRM: {}, sync every {}s, inactivity check every {}s)",
        config.sync.crm.provider(),
        config.sync.interval_secs,
        config.inactivity.check_interval_secs
    );

    let signal = tokio::signal::ctrl_c().await;

    tracing::info!("Shutting down");
    sync.stop().await;
    inactivity.stop().await;
    signal?;
    Ok(())
}
