//! Work record model (surveys and appointments awaiting CRM delivery)

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::uuid_id;
use super::worker::WorkerId;

uuid_id!(
    /// A unique identifier for a locally produced work record
    RecordId
);

/// Kind of work record, which also selects the remote object it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Survey,
    Appointment,
}

impl RecordType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Survey => "survey",
            Self::Appointment => "appointment",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "survey" => Ok(Self::Survey),
            "appointment" => Ok(Self::Appointment),
            other => Err(Error::InvalidInput(format!("Unknown record type: {other}"))),
        }
    }
}

/// A survey or appointment produced on this device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    /// Unique identifier
    pub id: RecordId,
    /// Survey or appointment
    pub record_type: RecordType,
    /// Worker who produced the record
    pub worker_id: WorkerId,
    /// Opaque field payload (JSON object)
    pub payload: serde_json::Value,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Delivered to the CRM
    pub synced: bool,
    /// Identifier assigned by the CRM, when known
    pub remote_id: Option<String>,
    /// Last delivery error, cleared on success
    pub sync_error: Option<String>,
    /// Remote reported a duplicate; needs a human decision
    pub needs_review: bool,
    /// Delivery timestamp (Unix ms)
    pub synced_at: Option<i64>,
}

impl WorkRecord {
    /// Create a new unsynced record. The payload must be a JSON object.
    pub fn new(
        record_type: RecordType,
        worker_id: WorkerId,
        payload: serde_json::Value,
        created_at: i64,
    ) -> Result<Self> {
        if !payload.is_object() {
            return Err(Error::InvalidInput(format!(
                "{record_type} payload must be a JSON object"
            )));
        }

        Ok(Self {
            id: RecordId::new(),
            record_type,
            worker_id,
            payload,
            created_at,
            synced: false,
            remote_id: None,
            sync_error: None,
            needs_review: false,
            synced_at: None,
        })
    }
}

/// Normalize a phone number into the digits used as the duplicate-detection key.
///
/// A leading US country code is dropped. Returns `None` when fewer than seven
/// digits remain.
///
/// # Examples
///
/// ```
/// use crewsync_core::models::normalize_phone;
///
/// assert_eq!(normalize_phone("+1 (555) 010-2030").as_deref(), Some("5550102030"));
/// assert_eq!(normalize_phone("n/a"), None);
/// ```
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let re = Regex::new(r"\D").expect("Invalid regex");
    let digits = re.replace_all(raw, "").into_owned();
    let digits = if digits.len() == 11 && digits.starts_with('1') {
        digits[1..].to_string()
    } else {
        digits
    };

    if digits.len() < 7 {
        None
    } else {
        Some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_requires_object_payload() {
        let worker_id = WorkerId::new();
        assert!(WorkRecord::new(RecordType::Survey, worker_id, serde_json::json!([1]), 0).is_err());

        let record = WorkRecord::new(
            RecordType::Appointment,
            worker_id,
            serde_json::json!({ "phone": "555-0100" }),
            42,
        )
        .unwrap();
        assert!(!record.synced);
        assert!(!record.needs_review);
        assert_eq!(record.created_at, 42);
    }

    #[test]
    fn test_record_type_roundtrip_str() {
        assert_eq!("Survey".parse::<RecordType>().unwrap(), RecordType::Survey);
        assert_eq!(RecordType::Appointment.to_string(), "appointment");
        assert!("lead".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("555.010.2030").as_deref(), Some("5550102030"));
        assert_eq!(normalize_phone("15550102030").as_deref(), Some("5550102030"));
        assert_eq!(normalize_phone("12345"), None);
    }
}
