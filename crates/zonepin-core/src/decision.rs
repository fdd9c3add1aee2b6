use crate::patch::PatchOperation;
use std::fmt;

/// Which path through the admission pipeline produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// No zone applies; the pod is admitted unmodified
    NoOp,
    /// The pod is admitted with a node affinity patch
    Patched,
    /// Something went wrong; the pod is admitted unmodified with a message
    Degraded,
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionOutcome::NoOp => write!(f, "noop"),
            DecisionOutcome::Patched => write!(f, "patched"),
            DecisionOutcome::Degraded => write!(f, "degraded"),
        }
    }
}

/// The answer to one admission request
///
/// Every constructor allows the pod: zone pinning is a scheduling
/// optimisation, so uncertainty resolves to admitting the pod unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionDecision {
    /// Request UID, copied verbatim from the review
    pub uid: String,
    pub allowed: bool,
    pub patch: Option<Vec<PatchOperation>>,
    /// Human-readable note for a non-fatal problem
    pub message: Option<String>,
}

impl AdmissionDecision {
    /// Allow unmodified
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            patch: None,
            message: None,
        }
    }

    /// Allow with a patch
    pub fn patched(uid: impl Into<String>, patch: Vec<PatchOperation>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            patch: Some(patch),
            message: None,
        }
    }

    /// Allow unmodified, carrying a message describing what went wrong
    pub fn degraded(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            patch: None,
            message: Some(message.into()),
        }
    }

    pub fn outcome(&self) -> DecisionOutcome {
        match (&self.patch, &self.message) {
            (Some(ops), _) if !ops.is_empty() => DecisionOutcome::Patched,
            (_, Some(_)) => DecisionOutcome::Degraded,
            _ => DecisionOutcome::NoOp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchValue;
    use k8s_openapi::api::core::v1::Affinity;

    #[test]
    fn test_allow() {
        let decision = AdmissionDecision::allow("uid-1");
        assert!(decision.allowed);
        assert!(decision.patch.is_none());
        assert!(decision.message.is_none());
        assert_eq!(decision.outcome(), DecisionOutcome::NoOp);
    }

    #[test]
    fn test_patched() {
        let ops = vec![PatchOperation::Add(PatchValue::Affinity(Affinity::default()))];
        let decision = AdmissionDecision::patched("uid-2", ops);
        assert!(decision.allowed);
        assert_eq!(decision.uid, "uid-2");
        assert_eq!(decision.outcome(), DecisionOutcome::Patched);
    }

    #[test]
    fn test_degraded_still_allows() {
        let decision = AdmissionDecision::degraded("uid-3", "cluster unreachable");
        assert!(decision.allowed);
        assert!(decision.patch.is_none());
        assert_eq!(decision.message.as_deref(), Some("cluster unreachable"));
        assert_eq!(decision.outcome(), DecisionOutcome::Degraded);
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let decision = AdmissionDecision::patched("uid-4", vec![]);
        assert_eq!(decision.outcome(), DecisionOutcome::NoOp);
    }
}
