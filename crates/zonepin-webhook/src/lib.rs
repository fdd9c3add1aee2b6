//! Zonepin Webhook - HTTP front end of the admission controller
//!
//! This crate provides:
//! - Axum-based HTTPS server with optional self-signed TLS
//! - AdmissionReview decoding and encoding
//! - The `/inject` mutation endpoint and health probes

// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod codec;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod tls;

// Re-export commonly used types
pub use error::{Result, WebhookError};
pub use server::{Config, WebhookServer};
pub use state::AppState;
pub use tls::{resolve_tls, TlsMaterial, TlsMode};
