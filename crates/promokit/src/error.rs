use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Normalized failure taxonomy shared by validation, admission control, and
/// the capability boundary.
///
/// The string form of each kind is stable and intended for logs and error
/// payloads surfaced to transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    CapacityExhausted,
    AuthError,
    RateLimit,
    Timeout,
    NetworkError,
    Transient,
    Fatal,
    Cancelled,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::CapacityExhausted => "CapacityExhausted",
            ErrorKind::AuthError => "AuthError",
            ErrorKind::RateLimit => "RateLimit",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::Transient => "Transient",
            ErrorKind::Fatal => "Fatal",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Unknown => "Unknown",
        }
    }

    /// Whether a failure of this kind is worth another attempt.
    ///
    /// `Unknown` is treated like `Transient`: an unclassifiable upstream
    /// failure gets the benefit of the doubt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit
                | ErrorKind::NetworkError
                | ErrorKind::Transient
                | ErrorKind::Unknown
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the public orchestrator API.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    #[error("concurrent job limit reached ({current}/{max})")]
    CapacityExhausted { current: usize, max: usize },

    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("timed out waiting for job {0}")]
    WaitTimeout(Uuid),

    #[error(transparent)]
    Bundle(#[from] crate::bundle::BundleError),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::InvalidInput { .. } => ErrorKind::InvalidInput,
            OrchestratorError::CapacityExhausted { .. } => ErrorKind::CapacityExhausted,
            OrchestratorError::JobNotFound(_) => ErrorKind::InvalidInput,
            OrchestratorError::WaitTimeout(_) => ErrorKind::Timeout,
            OrchestratorError::Bundle(_) => ErrorKind::Fatal,
        }
    }
}

/// A stage-level failure: the classified kind plus a human-readable message.
///
/// Carried by the pipeline between the retry wrapper and the stage status
/// transition; the job record itself only keeps the top-level error string.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct StageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "job cancelled")
    }

    pub fn timeout(label: &str, millis: u128) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("{label} timed out after {millis}ms"),
        )
    }
}
