//! Error types for phasetime-core operations.

use std::path::PathBuf;

use crate::phase::{PhaseKind, Trigger};

/// All errors that can occur in phasetime-core operations.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    // ─────────────────────────────────────────────────────────────────────
    // State Machine Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Bad state transition: trigger '{trigger}' is not allowed in state {state}")]
    BadStateTransition { state: PhaseKind, trigger: Trigger },

    #[error("Session already closed; trigger '{trigger}' ignored")]
    SessionClosed { trigger: Trigger },

    /// For custom [`RecordSink`](crate::phase::RecordSink) implementations
    /// that can refuse a record. The built-in history cache never does.
    #[error("Record sink rejected {kind} record: {details}")]
    SinkRejected { kind: PhaseKind, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Persistence Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Storage unavailable: {path}: {details}")]
    StorageUnavailable { path: PathBuf, details: String },

    #[error("Commit failed: {path}: {details}")]
    CommitFailed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Serialization Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PhaseError {
    /// True for failures a caller may retry without changing anything
    /// (the pending records are still cached).
    pub fn is_retryable(&self) -> bool {
        matches!(self, PhaseError::CommitFailed { .. })
    }
}

/// Convenience type alias for Results using PhaseError.
pub type Result<T> = std::result::Result<T, PhaseError>;

// Conversion for string error compatibility
impl From<PhaseError> for String {
    fn from(err: PhaseError) -> String {
        err.to_string()
    }
}
