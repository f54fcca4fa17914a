use thiserror::Error;

/// Error type that captures billing and persistence failures.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Lookup failed: {0}")]
    Lookup(String),
    #[error("Invalid format: {0}")]
    Format(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
