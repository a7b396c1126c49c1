//! Unified error hierarchy for SleepRS
//!
//! Data-driven fallbacks (unparseable timestamps, empty nights, zero totals)
//! are not errors and never surface here. Only inputs that cannot be
//! interpreted at all, and contract violations inside the engine, do.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all SleepRS operations
#[derive(Debug, Error)]
pub enum SleepError {
    /// The sleep record could not be located in the input value
    #[error("Invalid input shape: {reason}")]
    InvalidInputShape { reason: String },

    /// The record was located but one of its fields has the wrong type
    #[error("Invalid sleep record: {reason}")]
    InvalidRecord { reason: String },

    /// A reference range was requested by a name outside the fixed table
    #[error("Unknown reference range: {name}")]
    UnknownRange { name: String },

    /// Input file could not be read
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON syntax errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for SleepRS operations
pub type Result<T> = std::result::Result<T, SleepError>;

impl SleepError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SleepError::InvalidInputShape { .. } => ErrorSeverity::Error,
            SleepError::InvalidRecord { .. } => ErrorSeverity::Error,
            SleepError::UnknownRange { .. } => ErrorSeverity::Critical,
            SleepError::InputNotFound { .. } => ErrorSeverity::Warning,
            SleepError::Configuration(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SleepError::InvalidInputShape { .. } => {
                "Could not find a sleep record in the input. Expected an object, a list \
                 of objects, or an object with a non-empty \"nights\" list."
                    .to_string()
            }
            SleepError::InvalidRecord { reason } => {
                format!("The sleep record contains an invalid field: {}", reason)
            }
            SleepError::InputNotFound { path } => {
                format!("Could not find sleep data file: {}", path.display())
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Contract violation inside the engine
    Critical,
    /// Error that prevents analysis of the current input
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
