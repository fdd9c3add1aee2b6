// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for zonepin operations
#[derive(Error, Debug, Diagnostic)]
pub enum ZonepinError {
    /// The admitted object could not be read as a Pod
    #[error("Invalid pod: {reason}")]
    #[diagnostic(
        code(zonepin::invalid_pod),
        help("The webhook only handles core/v1 Pod objects; check the webhook's rules")
    )]
    InvalidPod {
        #[allow(unused)]
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(zonepin::serialization_error),
        help("This is likely a bug. Please report it with the offending object")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for zonepin operations
pub type Result<T> = std::result::Result<T, ZonepinError>;

impl ZonepinError {
    /// Create an InvalidPod error
    pub fn invalid_pod(reason: impl Into<String>) -> Self {
        Self::InvalidPod {
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
