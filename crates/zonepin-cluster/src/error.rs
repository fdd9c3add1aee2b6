use miette::Diagnostic;
use thiserror::Error;

/// Error type for cluster state lookups
#[derive(Error, Debug, Diagnostic)]
pub enum ClusterError {
    /// The requested object does not exist
    #[error("{kind} not found: {key}")]
    #[diagnostic(
        code(zonepin::cluster::not_found),
        help("The object may have been deleted, or the pod references a claim that was never created")
    )]
    NotFound {
        #[allow(unused)]
        kind: String,
        #[allow(unused)]
        key: String,
    },

    /// The API server could not be reached or refused to serve the reader
    #[error("Cluster state unavailable: {message}")]
    #[diagnostic(
        code(zonepin::cluster::unavailable),
        help("Check connectivity to the API server and that the webhook's service account may get persistentvolumeclaims and persistentvolumes")
    )]
    Unavailable {
        #[allow(unused)]
        message: String,
    },

    /// The API server answered with an error status
    #[error("API error {code} for {key}: {message}")]
    #[diagnostic(
        code(zonepin::cluster::api_error),
        help("Inspect the API server response for details")
    )]
    ApiError {
        #[allow(unused)]
        code: u16,
        #[allow(unused)]
        key: String,
        #[allow(unused)]
        message: String,
    },

    /// The response could not be decoded
    #[error("Failed to decode {key}: {message}")]
    #[diagnostic(
        code(zonepin::cluster::decode_error),
        help("The API server returned an object that does not match the core/v1 schema")
    )]
    DecodeError {
        #[allow(unused)]
        key: String,
        #[allow(unused)]
        message: String,
    },
}

/// Result type alias for cluster lookups
pub type Result<T> = std::result::Result<T, ClusterError>;

impl ClusterError {
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn api_error(code: u16, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn decode_error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeError {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the reader itself is unusable, as opposed to
    /// a problem with one particular object
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ClusterError::Unavailable { .. })
    }

    /// Classify a `kube::Error` raised while fetching `key`
    ///
    /// Authentication, authorisation, throttling and server-side failures mean
    /// no lookup can succeed, so they map to `Unavailable`. Transport errors do
    /// too.
    pub fn from_kube(err: kube::Error, kind: &str, key: &str) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Self::not_found(kind, key),
            kube::Error::Api(ae) if matches!(ae.code, 401 | 403 | 429) || ae.code >= 500 => {
                Self::unavailable(format!("{} {}: {}", kind, key, ae.message))
            }
            kube::Error::Api(ae) => Self::api_error(ae.code, key, ae.message),
            kube::Error::SerdeError(e) => Self::decode_error(key, e.to_string()),
            other => Self::unavailable(format!("{} {}: {}", kind, key, other)),
        }
    }
}
