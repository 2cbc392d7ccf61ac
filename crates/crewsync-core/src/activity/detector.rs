//! Inactivity scan over open shifts.

use crate::models::{ActivityObservation, ActivitySource, InactiveWorker, Shift, Worker};
use crate::services::DatabaseService;
use crate::util::{elapsed_minutes, format_clock_time};
use crate::Result;

/// Pick the most recent evidence of activity within a shift.
///
/// Heartbeats and work records only count from clock-in onwards; a heartbeat
/// wins a tie with a work record. Without either, the clock-in time is used.
pub fn resolve_last_activity(
    shift: &Shift,
    latest_heartbeat: Option<i64>,
    latest_record: Option<i64>,
) -> ActivityObservation {
    let since_clock_in = |at: Option<i64>| at.filter(|at| *at >= shift.clock_in_at);

    let (observed_at, source) = match (
        since_clock_in(latest_heartbeat),
        since_clock_in(latest_record),
    ) {
        (Some(heartbeat), Some(record)) if record > heartbeat => {
            (record, ActivitySource::WorkRecord)
        }
        (Some(heartbeat), _) => (heartbeat, ActivitySource::Heartbeat),
        (None, Some(record)) => (record, ActivitySource::WorkRecord),
        (None, None) => (shift.clock_in_at, ActivitySource::ClockInFallback),
    };

    ActivityObservation {
        worker_id: shift.worker_id,
        observed_at,
        source,
    }
}

/// Human-readable explanation for a flagged worker
pub fn describe_inactivity(
    shift: &Shift,
    last_activity: &ActivityObservation,
    inactive_minutes: i64,
) -> String {
    let since = format!(
        "{} at {}",
        last_activity.source.describe(),
        format_clock_time(last_activity.observed_at)
    );
    match shift.session_exited_at {
        Some(exited_at) => format!(
            "Exited the work session at {} while clocked in; {inactive_minutes} min since {since}",
            format_clock_time(exited_at)
        ),
        None => format!("No activity for {inactive_minutes} min since {since}"),
    }
}

/// Finds clocked-in workers without recent activity.
#[derive(Clone)]
pub struct InactivityDetector {
    db: DatabaseService,
}

impl InactivityDetector {
    pub const fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Last activity and whole minutes of inactivity for an open shift.
    pub async fn measure(&self, shift: &Shift, now: i64) -> Result<(ActivityObservation, i64)> {
        let (heartbeat, record) = self
            .db
            .latest_activity_since(&shift.worker_id, shift.clock_in_at)
            .await?;
        let last_activity = resolve_last_activity(shift, heartbeat, record);
        let minutes = elapsed_minutes(last_activity.observed_at, now);
        Ok((last_activity, minutes))
    }

    /// Flag every open shift whose worker has been inactive for at least
    /// `threshold_minutes`, or whose session was exited.
    pub async fn scan_for_inactive_workers(
        &self,
        threshold_minutes: i64,
        now: i64,
    ) -> Result<Vec<InactiveWorker>> {
        let mut flagged = Vec::new();

        for shift in self.db.list_open_shifts().await? {
            let Some(worker) = self.db.get_worker(&shift.worker_id).await? else {
                tracing::warn!(
                    "Skipping shift {}: worker {} not found",
                    shift.id,
                    shift.worker_id
                );
                continue;
            };

            let (last_activity, inactive_minutes) = self.measure(&shift, now).await?;
            let session_exited = shift.session_exited_at.is_some();
            if inactive_minutes < threshold_minutes && !session_exited {
                continue;
            }

            flagged.push(flag(&worker, &shift, last_activity, inactive_minutes));
        }

        tracing::debug!("Inactivity scan flagged {} worker(s)", flagged.len());
        Ok(flagged)
    }
}

fn flag(
    worker: &Worker,
    shift: &Shift,
    last_activity: ActivityObservation,
    inactive_minutes: i64,
) -> InactiveWorker {
    InactiveWorker {
        worker_id: worker.id,
        worker_name: worker.name.clone(),
        shift_id: shift.id,
        reason: describe_inactivity(shift, &last_activity, inactive_minutes),
        last_activity,
        inactive_minutes,
        session_exited: shift.session_exited_at.is_some(),
    }
}
