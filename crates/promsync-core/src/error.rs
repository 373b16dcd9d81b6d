//! Shared error type across promsync crates.

use thiserror::Error;

use crate::instrument::InstrumentKind;

/// Stable error codes, usable in logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid construction input or config file.
    Config,
    /// Instrument or metric name rejected.
    InvalidName,
    /// Name already registered in the source registry.
    Duplicate,
    /// Name registered as a different instrument kind.
    KindMismatch,
    /// Target registry refused a metric.
    Registration,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Config => "CONFIG",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::Duplicate => "DUPLICATE",
            ErrorCode::KindMismatch => "KIND_MISMATCH",
            ErrorCode::Registration => "REGISTRATION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PromSyncError>;

/// Unified error type used by core and bridge.
#[derive(Debug, Error)]
pub enum PromSyncError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("instrument already registered: {0}")]
    Duplicate(String),
    #[error("instrument {name} is a {registered}, not a {requested}")]
    KindMismatch {
        name: String,
        registered: InstrumentKind,
        requested: InstrumentKind,
    },
    #[error("registration failed for {name}: {reason}")]
    Registration { name: String, reason: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl PromSyncError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PromSyncError::Config(_) => ErrorCode::Config,
            PromSyncError::InvalidName(_) => ErrorCode::InvalidName,
            PromSyncError::Duplicate(_) => ErrorCode::Duplicate,
            PromSyncError::KindMismatch { .. } => ErrorCode::KindMismatch,
            PromSyncError::Registration { .. } => ErrorCode::Registration,
            PromSyncError::Internal(_) => ErrorCode::Internal,
        }
    }
}
