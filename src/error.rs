use crate::domain::order::Operation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Gateway error {code}: {message}")]
    Gateway { code: String, message: String },
    #[error("Signature validation failed: {0}")]
    Signature(String),
    #[error("{0} is not available for this order")]
    OperationUnavailable(Operation),
    /// The gateway answered without a status, usually wrong DirectLink credentials.
    #[error("An error occurred. Please try to place the order again. ({0})")]
    MissingStatus(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
