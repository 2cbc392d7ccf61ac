//! Two-tier escalation of flagged workers to supervisors.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::InactivitySettings;
use crate::models::{InactiveWorker, InactivityAction, InactivityLogDraft, Worker, WorkerId};
use crate::notify::Notifier;
use crate::services::DatabaseService;
use crate::Result;

use super::detector::InactivityDetector;

/// What has already been done for a worker in the current inactivity episode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationState {
    pub auto_logged: bool,
    pub push_sent: bool,
    pub sms_sent: bool,
}

/// Counts for one escalation tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscalationSummary {
    pub flagged: usize,
    pub pushes: usize,
    pub sms: usize,
    /// Workers whose state was reset because they became active again
    pub cleared: usize,
}

/// Periodic escalation driver. Owns the per-worker notification state.
pub struct EscalationMonitor<N> {
    db: DatabaseService,
    detector: InactivityDetector,
    notifier: Arc<N>,
    settings: InactivitySettings,
    states: HashMap<WorkerId, NotificationState>,
}

impl<N: Notifier> EscalationMonitor<N> {
    pub fn new(db: DatabaseService, notifier: Arc<N>, settings: InactivitySettings) -> Self {
        Self {
            detector: InactivityDetector::new(db.clone()),
            db,
            notifier,
            settings,
            states: HashMap::new(),
        }
    }

    pub fn state(&self, worker_id: &WorkerId) -> Option<NotificationState> {
        self.states.get(worker_id).copied()
    }

    /// Scan, then notify each flagged worker's supervisors at most once per tier.
    pub async fn tick(&mut self, now: i64) -> Result<EscalationSummary> {
        let flagged = self
            .detector
            .scan_for_inactive_workers(self.settings.threshold_minutes, now)
            .await?;

        let before = self.states.len();
        self.states
            .retain(|worker_id, _| flagged.iter().any(|worker| worker.worker_id == *worker_id));
        let mut summary = EscalationSummary {
            flagged: flagged.len(),
            cleared: before - self.states.len(),
            ..EscalationSummary::default()
        };
        if summary.cleared > 0 {
            tracing::debug!("Cleared notification state for {} active worker(s)", summary.cleared);
        }
        if flagged.is_empty() {
            return Ok(summary);
        }

        let supervisors = self.db.list_supervisors().await?;
        for worker in &flagged {
            let mut state = self.states.get(&worker.worker_id).copied().unwrap_or_default();
            let escalated = self
                .escalate(worker, &supervisors, &mut state, &mut summary, now)
                .await;
            // Flags for dispatches already made must survive a failed audit append.
            self.states.insert(worker.worker_id, state);
            escalated?;
        }

        Ok(summary)
    }

    async fn escalate(
        &self,
        worker: &InactiveWorker,
        supervisors: &[Worker],
        state: &mut NotificationState,
        summary: &mut EscalationSummary,
        now: i64,
    ) -> Result<()> {
        if self.settings.auto_log && !state.auto_logged {
            self.append(worker, InactivityAction::AutoLogged, worker.reason.clone(), now)
                .await?;
            state.auto_logged = true;
        }

        if !state.push_sent && worker.inactive_minutes >= self.settings.push_threshold_minutes {
            let tokens = supervisors
                .iter()
                .filter_map(|supervisor| supervisor.push_token.clone())
                .collect::<Vec<_>>();
            let title = format!("{} appears inactive", worker.worker_name);
            let notes = self
                .dispatch("push", tokens.len(), || {
                    self.notifier.send_push(&tokens, &title, &worker.reason)
                })
                .await;
            state.push_sent = true;
            summary.pushes += 1;
            self.append(worker, InactivityAction::PushNotificationSent, notes, now)
                .await?;
        }

        if !state.sms_sent && worker.inactive_minutes >= self.settings.sms_threshold_minutes {
            let phones = supervisors
                .iter()
                .filter_map(|supervisor| supervisor.phone.clone())
                .collect::<Vec<_>>();
            let body = format!("crewsync: {}. {}", worker.worker_name, worker.reason);
            let notes = self
                .dispatch("SMS", phones.len(), || self.notifier.send_sms(&phones, &body))
                .await;
            state.sms_sent = true;
            summary.sms += 1;
            self.append(worker, InactivityAction::SmsEscalationSent, notes, now)
                .await?;
        }

        Ok(())
    }

    /// Send through the notifier; failures are logged and folded into the audit note.
    async fn dispatch<F, Fut>(&self, channel: &str, recipients: usize, send: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::notify::NotifyResult<()>>,
    {
        if recipients == 0 {
            tracing::warn!("No supervisor recipients for {channel} escalation");
            return format!("{channel}: no supervisor recipients");
        }

        match send().await {
            Ok(()) => format!("{channel} sent to {recipients} supervisor(s)"),
            Err(error) => {
                tracing::warn!("{channel} escalation failed: {error}");
                format!("{channel} dispatch failed: {error}")
            }
        }
    }

    async fn append(
        &self,
        worker: &InactiveWorker,
        action: InactivityAction,
        notes: String,
        now: i64,
    ) -> Result<()> {
        let draft = InactivityLogDraft::for_inactive(worker, action).with_notes(notes);
        self.db.append_inactivity_log(&draft, now).await?;
        tracing::info!(
            "{} for {} ({} min inactive)",
            action,
            worker.worker_name,
            worker.inactive_minutes
        );
        Ok(())
    }
}
