//! Error types for risk engine

use thiserror::Error;

/// Risk engine error
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied a bad amount or timestamp
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// History store failed or timed out
    #[error("Transaction history unavailable: {0}")]
    HistoryUnavailable(String),

    /// User not known to the history store
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// KYC tier limit exceeded
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Alert sink rejected an alert
    #[error("Alert delivery failed: {0}")]
    AlertDelivery(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

impl From<ledger_core::Error> for Error {
    fn from(err: ledger_core::Error) -> Self {
        Error::HistoryUnavailable(err.to_string())
    }
}
