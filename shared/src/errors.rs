//! Shared error types for the conformance harness

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SharedError {
    #[error("Invalid transaction request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Unsupported transaction kind: {code}")]
    UnsupportedKind { code: String },

    #[error("Serialization failed: {message}")]
    SerializationError { message: String },

    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
