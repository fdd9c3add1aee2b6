//! Zonepin Core - Domain types shared by the zonepin admission webhook
//!
//! This crate provides:
//! - Records for the claims and volumes consulted during zone resolution
//! - The `ZoneSet` produced by resolution
//! - Typed JSON Patch operations for pod affinity
//! - The `AdmissionDecision` returned for every admission request
//! - Error types with miette diagnostics

pub mod decision;
pub mod error;
pub mod patch;
pub mod types;

// Re-export commonly used types
pub use decision::{AdmissionDecision, DecisionOutcome};
pub use error::{Result, ZonepinError};
pub use patch::{to_json_patch, PatchOperation, PatchValue};
pub use types::{ClaimPhase, ClaimRecord, VolumeRecord, VolumeReference, ZoneSet};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
    PersistentVolume, PersistentVolumeClaim, Pod, Volume,
};

/// Well-known topology label carrying a volume's availability zone
pub const ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Node selector operator requiring the label value to be one of a set
pub const NODE_SELECTOR_OP_IN: &str = "In";

/// Serialize a value to a JSON document
pub fn to_json_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| {
        ZonepinError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a value from a JSON document
pub fn from_json_value<T: for<'de> serde::Deserialize<'de>>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        ZonepinError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}
