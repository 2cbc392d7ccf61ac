//! Long-lived owner of the escalation loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::InactivitySettings;
use crate::notify::Notifier;
use crate::services::background::{non_overlapping_interval, BackgroundTask};
use crate::services::DatabaseService;
use crate::util::now_ms;
use crate::{Error, Result};

use super::escalation::EscalationMonitor;

/// Runs an escalation tick every `check_interval_secs`.
///
/// Each `start` begins with empty notification state; the state lives inside
/// the spawned task only.
pub struct InactivityService<N> {
    db: DatabaseService,
    notifier: Arc<N>,
    settings: InactivitySettings,
    task: Option<BackgroundTask>,
}

impl<N: Notifier + 'static> InactivityService<N> {
    pub const fn new(db: DatabaseService, notifier: Arc<N>, settings: InactivitySettings) -> Self {
        Self {
            db,
            notifier,
            settings,
            task: None,
        }
    }

    pub const fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn start(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Err(Error::InvalidInput(
                "inactivity service already running".to_string(),
            ));
        }

        let interval = Duration::from_secs(self.settings.check_interval_secs);
        let monitor = EscalationMonitor::new(
            self.db.clone(),
            Arc::clone(&self.notifier),
            self.settings.clone(),
        );
        self.task = Some(BackgroundTask::spawn("inactivity service", move |shutdown| {
            run_loop(monitor, interval, shutdown)
        }));
        Ok(())
    }

    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop().await;
        }
    }
}

async fn run_loop<N: Notifier>(
    mut monitor: EscalationMonitor<N>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = non_overlapping_interval(interval);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        if *shutdown.borrow() {
            break;
        }

        match monitor.tick(now_ms()).await {
            Ok(summary) => tracing::debug!(
                "Inactivity tick: {} flagged, {} push, {} SMS",
                summary.flagged,
                summary.pushes,
                summary.sms
            ),
            Err(error) => tracing::error!("Inactivity check failed: {error}"),
        }
    }
}
