use std::time::Duration;
use zonepin_core::{Affinity, Pod, Result, VolumeReference, ZonepinError, ZONE_LABEL};

/// Configuration for the admission engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Label read from volumes and matched against nodes
    pub zone_label: String,
    /// Upper bound on total zone resolution time per request
    pub resolve_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zone_label: ZONE_LABEL.to_string(),
            resolve_timeout: Duration::from_secs(5),
        }
    }
}

/// The parts of an admission request the engine decides on
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionInput {
    /// Request UID, echoed in the decision
    pub uid: String,
    /// Namespace claims are looked up in
    pub namespace: String,
    pub volumes: Vec<VolumeReference>,
    /// The pod's current affinity block
    pub affinity: Option<Affinity>,
}

impl AdmissionInput {
    /// Extract the engine input from a pod
    ///
    /// The request namespace wins over `metadata.namespace`, which is usually
    /// unset for pods created by controllers.
    pub fn from_pod(
        uid: impl Into<String>,
        request_namespace: Option<&str>,
        pod: &Pod,
    ) -> Result<Self> {
        let namespace = request_namespace
            .filter(|ns| !ns.is_empty())
            .or(pod.metadata.namespace.as_deref().filter(|ns| !ns.is_empty()))
            .ok_or_else(|| ZonepinError::invalid_pod("pod has no namespace"))?
            .to_string();

        let spec = pod.spec.as_ref();
        let volumes = spec
            .and_then(|s| s.volumes.as_ref())
            .map(|vols| vols.iter().map(VolumeReference::from).collect())
            .unwrap_or_default();

        Ok(Self {
            uid: uid.into(),
            namespace,
            volumes,
            affinity: spec.and_then(|s| s.affinity.clone()),
        })
    }
}
