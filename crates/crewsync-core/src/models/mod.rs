//! Data models for crewsync

/// Declares a UUID v7 backed identifier newtype (time-sortable).
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[derive(serde::Serialize, serde::Deserialize)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new unique identifier using UUID v7
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Get the string representation of this ID
            #[must_use]
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s.trim())?))
            }
        }
    };
}

pub(crate) use uuid_id;

mod inactivity;
mod record;
mod shift;
mod sync_queue;
mod worker;

pub use inactivity::{
    ActionActor, ActivityObservation, ActivitySource, InactiveWorker, InactivityAction,
    InactivityLogDraft, InactivityLogEntry,
};
pub use record::{normalize_phone, RecordId, RecordType, WorkRecord};
pub use shift::{Heartbeat, Shift, ShiftId, ShiftStorage};
pub use sync_queue::{FailedSyncItem, SyncQueueItem, SyncRunLog, SyncRunStats};
pub use worker::{Worker, WorkerId, WorkerRole};
