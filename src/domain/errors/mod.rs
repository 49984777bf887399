// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// A mapping or filter references an undeclared label or an input index
    /// outside the bound collection
    InvalidMapping(String),
    /// Mutually exclusive configuration was requested
    CompositionConflict(String),
    /// The transcode process failed or was terminated
    EngineFailure {
        message: String,
        /// Tail of the engine's diagnostic output
        diagnostics: String,
    },
    /// A produced file could not be copied to its destination or its
    /// visibility could not be set
    StagingFailure {
        destination: String,
        message: String,
        /// Destinations that were fully staged before the failure
        staged: Vec<String>,
    },
    /// No disk registered under the given name
    DiskNotFound(String),
    /// File system operation failed
    FsFail(String),
    /// Configuration could not be loaded or is invalid
    ConfigFail(String),
    /// Internal error
    InternalError(String),
}

impl DomainError {
    /// Whether the error was raised before any process was started
    pub fn is_composition_error(&self) -> bool {
        matches!(
            self,
            DomainError::BadArgs(_)
                | DomainError::InvalidMapping(_)
                | DomainError::CompositionConflict(_)
        )
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::InvalidMapping(msg) => write!(f, "Invalid mapping: {}", msg),
            DomainError::CompositionConflict(msg) => write!(f, "Composition conflict: {}", msg),
            DomainError::EngineFailure { message, diagnostics } => {
                if diagnostics.is_empty() {
                    write!(f, "Engine failure: {}", message)
                } else {
                    write!(f, "Engine failure: {}\n{}", message, diagnostics)
                }
            }
            DomainError::StagingFailure {
                destination,
                message,
                ..
            } => write!(f, "Staging failed for {}: {}", destination, message),
            DomainError::DiskNotFound(name) => write!(f, "Disk not found: {}", name),
            DomainError::FsFail(msg) => write!(f, "File system error: {}", msg),
            DomainError::ConfigFail(msg) => write!(f, "Configuration error: {}", msg),
            DomainError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
