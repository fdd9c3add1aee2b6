// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Engine error type
///
/// None of these reject a pod; the engine turns each into a degraded allow.
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    /// No zone could be resolved because the cluster state reader is unreachable
    #[error("Cluster state reader unavailable: {message}")]
    #[diagnostic(
        code(engine::reader_unavailable),
        help("The pod was admitted without zone affinity. Check API server connectivity and RBAC for the webhook")
    )]
    ReaderUnavailable {
        #[allow(unused)]
        message: String,
    },

    /// Zone resolution exceeded its time budget
    #[error("Zone resolution timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(engine::timeout),
        help("The pod was admitted without zone affinity. Raise --resolve-timeout-ms or investigate API server latency")
    )]
    Timeout {
        #[allow(unused)]
        timeout_ms: u128,
    },

    /// Core error
    #[error(transparent)]
    #[diagnostic(transparent)]
    CoreError(#[from] zonepin_core::ZonepinError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Create a ReaderUnavailable error
    pub fn reader_unavailable(message: impl Into<String>) -> Self {
        Self::ReaderUnavailable {
            message: message.into(),
        }
    }

    /// Create a Timeout error
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis(),
        }
    }
}
