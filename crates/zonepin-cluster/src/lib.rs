//! Zonepin Cluster - Read-only access to claims and volumes
//!
//! This crate provides:
//! - The `ClusterStateReader` trait consumed by zone resolution
//! - `KubeStateReader`, backed by a shared `kube::Client`
//! - `MemoryStateReader`, an in-memory reader for tests and local runs

// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod error;
pub mod kube_reader;
pub mod memory;
pub mod traits;

// Re-export primary types
pub use error::{ClusterError, Result};
pub use kube_reader::KubeStateReader;
pub use memory::{Lookup, MemoryStateReader};
pub use traits::ClusterStateReader;
