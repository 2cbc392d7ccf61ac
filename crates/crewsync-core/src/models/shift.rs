//! Shift (attendance period) and heartbeat models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::uuid_id;
use super::worker::WorkerId;

uuid_id!(
    /// A unique identifier for a shift
    ShiftId
);

/// Where a shift record currently lives.
///
/// Shifts opened while offline stay in local storage until an upload mirrors
/// them into the remote attendance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStorage {
    /// Mirrored from the remote attendance database
    #[default]
    Remote,
    /// Created on this device and not yet uploaded
    LocalOnly,
}

impl ShiftStorage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::LocalOnly => "local_only",
        }
    }
}

impl fmt::Display for ShiftStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftStorage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "remote" => Ok(Self::Remote),
            "local_only" => Ok(Self::LocalOnly),
            other => Err(Error::InvalidInput(format!("Unknown shift storage: {other}"))),
        }
    }
}

/// A worker's clock-in to clock-out attendance period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    /// Unique identifier
    pub id: ShiftId,
    /// Worker who owns the shift
    pub worker_id: WorkerId,
    /// Clock-in timestamp (Unix ms)
    pub clock_in_at: i64,
    /// Clock-out timestamp (Unix ms), `None` while open
    pub clock_out_at: Option<i64>,
    /// Set when the worker left the work session (app backgrounded/closed)
    pub session_exited_at: Option<i64>,
    /// Which store holds the shift
    pub storage: ShiftStorage,
}

impl Shift {
    /// Open a new shift for a worker at the given time.
    #[must_use]
    pub fn open(worker_id: WorkerId, clock_in_at: i64, storage: ShiftStorage) -> Self {
        Self {
            id: ShiftId::new(),
            worker_id,
            clock_in_at,
            clock_out_at: None,
            session_exited_at: None,
            storage,
        }
    }

    pub const fn is_open(&self) -> bool {
        self.clock_out_at.is_none()
    }
}

/// Low-level liveness ping, distinct from substantive work output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub worker_id: WorkerId,
    pub observed_at: i64,
}
