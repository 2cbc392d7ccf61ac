//! Activity and inactivity audit models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::shift::ShiftId;
use super::worker::WorkerId;

/// Kind of evidence behind a worker's last activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    Heartbeat,
    WorkRecord,
    ClockInFallback,
}

impl ActivitySource {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Heartbeat => "last heartbeat",
            Self::WorkRecord => "last work record",
            Self::ClockInFallback => "clock-in",
        }
    }
}

/// Most recent evidence that a worker was doing something. Derived per scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityObservation {
    pub worker_id: WorkerId,
    pub observed_at: i64,
    pub source: ActivitySource,
}

/// A clocked-in worker flagged by an inactivity scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactiveWorker {
    pub worker_id: WorkerId,
    pub worker_name: String,
    pub shift_id: ShiftId,
    pub last_activity: ActivityObservation,
    pub inactive_minutes: i64,
    /// The shift carries an explicit "left the work session" marker
    pub session_exited: bool,
    /// Human-readable explanation
    pub reason: String,
}

/// Action recorded in the inactivity audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactivityAction {
    AutoLogged,
    Notified,
    ForceClockedOut,
    PushNotificationSent,
    SmsEscalationSent,
}

impl InactivityAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoLogged => "auto_logged",
            Self::Notified => "notified",
            Self::ForceClockedOut => "force_clocked_out",
            Self::PushNotificationSent => "push_notification_sent",
            Self::SmsEscalationSent => "sms_escalation_sent",
        }
    }
}

impl fmt::Display for InactivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InactivityAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto_logged" => Ok(Self::AutoLogged),
            "notified" => Ok(Self::Notified),
            "force_clocked_out" => Ok(Self::ForceClockedOut),
            "push_notification_sent" => Ok(Self::PushNotificationSent),
            "sms_escalation_sent" => Ok(Self::SmsEscalationSent),
            other => Err(Error::InvalidInput(format!(
                "Unknown inactivity action: {other}"
            ))),
        }
    }
}

/// Who took an inactivity action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionActor {
    Worker,
    System,
    Admin,
}

impl ActionActor {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::System => "system",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for ActionActor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "worker" => Ok(Self::Worker),
            "system" => Ok(Self::System),
            "admin" => Ok(Self::Admin),
            other => Err(Error::InvalidInput(format!("Unknown action actor: {other}"))),
        }
    }
}

/// An audit entry not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactivityLogDraft {
    pub worker_id: WorkerId,
    pub shift_id: Option<ShiftId>,
    pub last_activity_at: Option<i64>,
    pub inactive_minutes: Option<i64>,
    pub action: InactivityAction,
    pub by_whom: ActionActor,
    pub notes: Option<String>,
}

impl InactivityLogDraft {
    #[must_use]
    pub const fn new(worker_id: WorkerId, action: InactivityAction, by_whom: ActionActor) -> Self {
        Self {
            worker_id,
            shift_id: None,
            last_activity_at: None,
            inactive_minutes: None,
            action,
            by_whom,
            notes: None,
        }
    }

    /// Attach the shift and inactivity measurements of a flagged worker.
    #[must_use]
    pub const fn for_inactive(worker: &InactiveWorker, action: InactivityAction) -> Self {
        Self {
            worker_id: worker.worker_id,
            shift_id: Some(worker.shift_id),
            last_activity_at: Some(worker.last_activity.observed_at),
            inactive_minutes: Some(worker.inactive_minutes),
            action,
            by_whom: ActionActor::System,
            notes: None,
        }
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = crate::util::normalize_text_option(Some(notes.into()));
        self
    }
}

/// Persisted inactivity audit entry (append-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivityLogEntry {
    pub id: i64,
    pub worker_id: WorkerId,
    pub shift_id: Option<ShiftId>,
    pub last_activity_at: Option<i64>,
    pub inactive_minutes: Option<i64>,
    pub action: InactivityAction,
    pub by_whom: ActionActor,
    pub notes: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}
