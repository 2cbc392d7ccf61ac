//! Storage layer for crewsync

mod connection;
mod decode;
mod inactivity_repository;
mod migrations;
mod queue_repository;
mod workforce_repository;

pub use connection::Database;
pub use inactivity_repository::{InactivityLogRepository, LibSqlInactivityLogRepository};
pub use queue_repository::{LibSqlSyncQueueRepository, SyncQueueRepository};
pub use workforce_repository::{LibSqlWorkforceRepository, WorkforceRepository};
