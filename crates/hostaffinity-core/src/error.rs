// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for host-affinity operations
#[derive(Error, Debug, Diagnostic)]
pub enum HostAffinityError {
    /// A declarative label selector could not be converted
    #[error("Invalid label selector requirement '{requirement}': {reason}")]
    #[diagnostic(
        code(hostaffinity::invalid_selector),
        help("Label keys must be qualified names, values at most 63 characters; In/NotIn need values, Exists/DoesNotExist must have none")
    )]
    InvalidSelector {
        #[allow(unused)]
        requirement: String,
        #[allow(unused)]
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(hostaffinity::serialization_error),
        help("Ensure the document is valid JSON or YAML in Kubernetes object format")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, HostAffinityError>;

impl HostAffinityError {
    /// Create an InvalidSelector error
    pub fn invalid_selector(requirement: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            requirement: requirement.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}
