use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("Invalid screening input: {0}")]
    InvalidInput(String),

    #[error("Transaction history unavailable: {0}")]
    HistoryUnavailable(String),

    #[error("Sanctions list load failed: {0}")]
    ListLoad(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Report export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ledger_core::Error> for ComplianceError {
    fn from(err: ledger_core::Error) -> Self {
        ComplianceError::HistoryUnavailable(err.to_string())
    }
}

impl From<csv::Error> for ComplianceError {
    fn from(err: csv::Error) -> Self {
        ComplianceError::ListLoad(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ComplianceError>;
