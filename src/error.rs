//! Error types for profiling sessions

use thiserror::Error;

use crate::step::ContextId;

/// Errors that can occur while entering, exiting or exporting a traced scope
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("profiling session is already active")]
    AlreadyActive,

    #[error("profiling session is not active")]
    NotActive,

    #[error("step source is already registered for context {context}")]
    SourceBusy { context: ContextId },

    #[error("invalid profiler configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for profiling operations
pub type Result<T> = std::result::Result<T, ProfileError>;
