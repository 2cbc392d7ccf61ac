//! Supervisor-invoked inactivity actions.

use crate::models::{
    ActionActor, InactivityAction, InactivityLogDraft, InactivityLogEntry, Shift, ShiftId,
    WorkerId,
};
use crate::services::DatabaseService;
use crate::{Error, Result};

use super::detector::InactivityDetector;

#[derive(Clone)]
pub struct InactivityAdmin {
    db: DatabaseService,
    detector: InactivityDetector,
}

impl InactivityAdmin {
    pub fn new(db: DatabaseService) -> Self {
        Self {
            detector: InactivityDetector::new(db.clone()),
            db,
        }
    }

    /// Close a shift at `now`, whichever store holds it, and audit the action.
    ///
    /// Inactivity is measured before the shift is closed.
    pub async fn force_clock_out(
        &self,
        shift_id: &ShiftId,
        reason: &str,
        now: i64,
    ) -> Result<(Shift, InactivityLogEntry)> {
        let shift = self
            .db
            .get_shift(shift_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("shift {shift_id}")))?;
        if !shift.is_open() {
            return Err(Error::InvalidInput(format!("Shift {shift_id} is already closed")));
        }

        let (last_activity, inactive_minutes) = self.detector.measure(&shift, now).await?;
        let closed = self.db.close_shift(shift_id, now).await?;

        let draft = InactivityLogDraft {
            shift_id: Some(closed.id),
            last_activity_at: Some(last_activity.observed_at),
            inactive_minutes: Some(inactive_minutes),
            ..InactivityLogDraft::new(
                closed.worker_id,
                InactivityAction::ForceClockedOut,
                ActionActor::Admin,
            )
        }
        .with_notes(reason);
        let entry = self.db.append_inactivity_log(&draft, now).await?;

        tracing::info!(
            "Force clocked out shift {shift_id} ({} storage) after {inactive_minutes} min inactive",
            closed.storage
        );
        Ok((closed, entry))
    }

    /// Record that a supervisor reached the worker through another channel.
    pub async fn log_manual_notification(
        &self,
        worker_id: &WorkerId,
        reason: &str,
        now: i64,
    ) -> Result<InactivityLogEntry> {
        if self.db.get_worker(worker_id).await?.is_none() {
            return Err(Error::NotFound(format!("worker {worker_id}")));
        }

        let mut draft =
            InactivityLogDraft::new(*worker_id, InactivityAction::Notified, ActionActor::Admin)
                .with_notes(reason);
        if let Some(shift) = self.db.open_shift_for_worker(worker_id).await? {
            let (last_activity, inactive_minutes) = self.detector.measure(&shift, now).await?;
            draft.shift_id = Some(shift.id);
            draft.last_activity_at = Some(last_activity.observed_at);
            draft.inactive_minutes = Some(inactive_minutes);
        }

        self.db.append_inactivity_log(&draft, now).await
    }
}
