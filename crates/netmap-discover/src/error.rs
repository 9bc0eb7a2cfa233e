//! Error types for the netmap-discover crate.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("invalid network CIDR: {range}: {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("scan already in progress")]
    AlreadyInProgress,

    #[error("scan not found")]
    NotFound,

    #[error("scan is not running")]
    NotRunning,

    #[error("no scan in progress")]
    NoActiveScan,
}

pub type Result<T> = std::result::Result<T, ScanError>;
