//! crewsync-core - Core library for crewsync
//!
//! This crate contains the shared models, storage layer, and the two background
//! routines used by the `crewsync` CLI: the CRM sync queue processor and the
//! inactivity detector with its escalation loop.

pub mod activity;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{
    FailedSyncItem, InactiveWorker, InactivityLogEntry, RecordId, RecordType, Shift, ShiftId,
    SyncQueueItem, SyncRunStats, WorkRecord, Worker, WorkerId, WorkerRole,
};
