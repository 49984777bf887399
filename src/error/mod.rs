//! Error handling module for ffexport

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for the outer surface (configuration, job files, CLI)
#[derive(Error, Debug)]
pub enum ExportError {
    /// Job description file not found or inaccessible
    #[error("Job file not found: {path}")]
    JobFileNotFound { path: String },

    /// Job description could not be parsed
    #[error("Invalid job file {path}: {message}")]
    InvalidJob { path: String, message: String },

    /// Configuration file could not be parsed
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Core export error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for ffexport operations
pub type ExportResult<T> = std::result::Result<T, ExportError>;
