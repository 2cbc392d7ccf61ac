//! Sync queue models

use serde::{Deserialize, Serialize};

use super::record::{RecordId, RecordType};

/// A locally produced record awaiting delivery to the CRM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Queue position (monotonic, enqueue order)
    pub id: i64,
    /// Survey or appointment
    pub record_type: RecordType,
    /// Originating record
    pub record_id: RecordId,
    /// Snapshot of the record payload at enqueue time
    pub payload: serde_json::Value,
    /// Enqueue timestamp (Unix ms)
    pub enqueued_at: i64,
    /// Failed delivery attempts so far
    pub retry_count: u32,
    /// Last delivery error, if any
    pub last_error: Option<String>,
}

/// A queue item whose retry budget is exhausted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedSyncItem {
    pub id: i64,
    pub record_type: RecordType,
    pub record_id: RecordId,
    pub payload: serde_json::Value,
    pub enqueued_at: i64,
    pub retry_count: u32,
    /// The last observed delivery error
    pub last_error: String,
    /// When the item was moved to the failure log (Unix ms)
    pub failed_at: i64,
}

/// Counts for one processing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRunStats {
    /// Delivered and removed from the queue
    pub delivered: u32,
    /// Already present remotely, flagged for review
    pub duplicates: u32,
    /// Moved to the permanent-failure log
    pub failed: u32,
    /// Failed but kept for another attempt
    pub retried: u32,
}

impl SyncRunStats {
    pub const fn attempted(&self) -> u32 {
        self.delivered + self.duplicates + self.failed + self.retried
    }

    pub const fn is_empty(&self) -> bool {
        self.attempted() == 0
    }
}

/// A persisted entry of the running delivery-statistics log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRunLog {
    pub id: i64,
    pub started_at: i64,
    pub finished_at: i64,
    pub stats: SyncRunStats,
}
