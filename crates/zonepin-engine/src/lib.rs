//! Zonepin Engine - Zone resolution and affinity patching
//!
//! This crate provides:
//! - `ZoneResolver`: pod volumes -> claims -> volumes -> zone labels
//! - `AffinityPatchBuilder`: zone set + existing affinity -> JSON Patch
//! - `AdmissionDecisionEngine`: the fail-open admission pipeline

pub mod affinity;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use affinity::AffinityPatchBuilder;
pub use engine::AdmissionDecisionEngine;
pub use error::{EngineError, Result};
pub use resolver::ZoneResolver;
pub use types::{AdmissionInput, EngineConfig};
