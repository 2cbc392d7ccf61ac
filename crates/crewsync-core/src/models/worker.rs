//! Worker model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::uuid_id;

uuid_id!(
    /// A unique identifier for a worker account
    WorkerId
);

/// Account role within the crew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    /// Field worker running surveys
    #[default]
    Worker,
    /// Crew supervisor, receives inactivity escalations
    Supervisor,
    /// Office administrator, also receives escalations
    Admin,
}

impl WorkerRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Supervisor => "supervisor",
            Self::Admin => "admin",
        }
    }

    /// Whether accounts with this role are escalation recipients.
    pub const fn is_supervisor(self) -> bool {
        matches!(self, Self::Supervisor | Self::Admin)
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worker" | "surveyor" => Ok(Self::Worker),
            "supervisor" | "manager" => Ok(Self::Supervisor),
            "admin" => Ok(Self::Admin),
            other => Err(Error::InvalidInput(format!("Unknown worker role: {other}"))),
        }
    }
}

/// A crew member account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    /// Unique identifier
    pub id: WorkerId,
    /// Display name
    pub name: String,
    /// Account role
    pub role: WorkerRole,
    /// Phone number used for SMS escalations
    pub phone: Option<String>,
    /// Push token used for push escalations
    pub push_token: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Worker {
    /// Create a new worker, trimming optional contact fields.
    pub fn new(
        name: impl Into<String>,
        role: WorkerRole,
        phone: Option<String>,
        push_token: Option<String>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("Worker name cannot be empty".to_string()));
        }

        Ok(Self {
            id: WorkerId::new(),
            name,
            role,
            phone: crate::util::normalize_text_option(phone),
            push_token: crate::util::normalize_text_option(push_token),
            created_at: chrono::Utc::now().timestamp_millis(),
        })
    }
}
