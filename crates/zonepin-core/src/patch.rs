use crate::error::Result;
use jsonptr::PointerBuf;
use k8s_openapi::api::core::v1::{Affinity, NodeSelector, NodeSelectorTerm};
use std::fmt;

const AFFINITY_PATH: [&str; 2] = ["spec", "affinity"];
const REQUIRED_NODE_SELECTOR_PATH: [&str; 4] = [
    "spec",
    "affinity",
    "nodeAffinity",
    "requiredDuringSchedulingIgnoredDuringExecution",
];

/// A value written into a pod's affinity, tagged by where it lands
///
/// Each variant owns its target path, so an operation can never pair a value
/// with a location of the wrong shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    /// A complete affinity block at `/spec/affinity`
    Affinity(Affinity),
    /// A required node selector at `/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution`
    RequiredNodeSelector(NodeSelector),
    /// One node selector term appended to the end of the required term list
    AppendedTerm(NodeSelectorTerm),
}

impl PatchValue {
    /// JSON pointer this value is written to
    pub fn path(&self) -> PointerBuf {
        match self {
            PatchValue::Affinity(_) => PointerBuf::from_tokens(AFFINITY_PATH),
            PatchValue::RequiredNodeSelector(_) => {
                PointerBuf::from_tokens(REQUIRED_NODE_SELECTOR_PATH)
            }
            PatchValue::AppendedTerm(_) => PointerBuf::from_tokens(
                REQUIRED_NODE_SELECTOR_PATH
                    .into_iter()
                    .chain(["nodeSelectorTerms", "-"]),
            ),
        }
    }

    /// Serialized JSON value
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match self {
            PatchValue::Affinity(affinity) => crate::to_json_value(affinity),
            PatchValue::RequiredNodeSelector(selector) => crate::to_json_value(selector),
            PatchValue::AppendedTerm(term) => crate::to_json_value(term),
        }
    }
}

/// One step of a JSON Patch against a Pod
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    Add(PatchValue),
}

impl PatchOperation {
    /// The RFC 6902 `op` name
    pub fn op(&self) -> &'static str {
        match self {
            PatchOperation::Add(_) => "add",
        }
    }

    pub fn path(&self) -> PointerBuf {
        match self {
            PatchOperation::Add(value) => value.path(),
        }
    }

    /// Convert into an untyped `json_patch` operation for the wire
    pub fn to_json_patch(&self) -> Result<json_patch::PatchOperation> {
        match self {
            PatchOperation::Add(value) => Ok(json_patch::PatchOperation::Add(
                json_patch::AddOperation {
                    path: value.path(),
                    value: value.to_json()?,
                },
            )),
        }
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op(), self.path())
    }
}

/// Convert a typed operation sequence into a `json_patch::Patch`
pub fn to_json_patch(ops: &[PatchOperation]) -> Result<json_patch::Patch> {
    ops.iter()
        .map(PatchOperation::to_json_patch)
        .collect::<Result<Vec<_>>>()
        .map(json_patch::Patch)
}
