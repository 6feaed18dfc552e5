//! Conformance engine error types

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Misuse of the scenario context or invalid configuration
///
/// Transaction failures are never reported here; they become outcomes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarnessError {
    #[error("No current outcome: {message}")]
    NoCurrentOutcome { message: String },

    #[error("No active request builder: {message}")]
    NoActiveBuilder { message: String },

    #[error("No raw reply recorded: {message}")]
    NoLastReply { message: String },

    #[error("Simulator connection unavailable: {message}")]
    ConnectionUnavailable { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Report output failed: {message}")]
    ReportError { message: String },

    #[error(transparent)]
    Shared(#[from] shared::SharedError),
}

/// What went wrong below the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request did not complete within the client timeout
    Timeout,
    /// Connection refused or reset
    Connect,
    Other,
}

/// Failure to exchange a request with the simulator
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Simulator transport error ({kind:?}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    /// Failure that a reconnect could plausibly fix
    pub fn is_connectivity(&self) -> bool {
        self.kind == TransportErrorKind::Connect
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let message = error.to_string();
        if error.is_timeout() {
            Self::timeout(message)
        } else if error.is_connect() {
            Self::connect(message)
        } else {
            Self::new(TransportErrorKind::Other, message)
        }
    }
}
