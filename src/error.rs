use serde::Deserialize;
use thiserror::Error;

/// Failure reported by the remote payments API, or by the transport carrying
/// the request. Propagated unchanged to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Deserialize)]
#[error("{status_code} {category_code}: {description}")]
pub struct RemoteError {
    pub status_code: u16,
    #[serde(default)]
    pub category_code: String,
    #[serde(default)]
    pub description: String,
}

impl RemoteError {
    pub fn new(status_code: u16, category_code: &str, description: impl Into<String>) -> Self {
        Self {
            status_code,
            category_code: category_code.to_string(),
            description: description.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Remote API error: {0}")]
    RemoteError(#[from] RemoteError),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Contract violation: {0}")]
    ContractViolation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
