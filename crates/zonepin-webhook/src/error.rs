use miette::Diagnostic;
use std::net::SocketAddr;
use thiserror::Error;

/// Webhook error type
#[derive(Error, Debug, Diagnostic)]
pub enum WebhookError {
    /// The request body is not a usable AdmissionReview
    #[error("Invalid admission review: {message}")]
    #[diagnostic(
        code(webhook::invalid_review),
        help("The body must be an admission.k8s.io/v1 AdmissionReview with a request")
    )]
    InvalidReview {
        #[allow(unused)]
        message: String,
    },

    /// TLS material could not be loaded into the server
    #[error("TLS configuration failed: {message}")]
    #[diagnostic(
        code(webhook::tls_error),
        help("Check that the certificate and key are PEM encoded and belong together")
    )]
    TlsError {
        #[allow(unused)]
        message: String,
    },

    /// The listener could not be bound or the server stopped with an error
    #[error("Server error on {addr}: {source}")]
    #[diagnostic(
        code(webhook::server_error),
        help("Check that the address is free and the process may bind to it")
    )]
    ServerError {
        #[allow(unused)]
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;

impl WebhookError {
    pub fn invalid_review(message: impl Into<String>) -> Self {
        Self::InvalidReview {
            message: message.into(),
        }
    }

    pub fn tls_error(message: impl Into<String>) -> Self {
        Self::TlsError {
            message: message.into(),
        }
    }

    pub fn server_error(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::ServerError { addr, source }
    }
}
