use std::io;

use crewsync_core::notify::NotifyError;
use crewsync_core::sync::CrmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] crewsync_core::Error),
    #[error(transparent)]
    LibSql(#[from] libsql::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Crm(#[from] CrmError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("Invalid {kind} ID: {value}")]
    InvalidId { kind: &'static str, value: String },
    #[error("Record payload must be a JSON object")]
    PayloadNotObject,
    #[error("Reason cannot be empty")]
    EmptyReason,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Network probe error: {0}")]
    Probe(String),
}
