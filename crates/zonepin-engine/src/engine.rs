use crate::affinity::AffinityPatchBuilder;
use crate::error::EngineError;
use crate::resolver::ZoneResolver;
use crate::types::{AdmissionInput, EngineConfig};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use zonepin_cluster::ClusterStateReader;
use zonepin_core::AdmissionDecision;

/// Fail-open admission pipeline for pods
///
/// Holds no per-request state; one engine serves all requests concurrently.
pub struct AdmissionDecisionEngine {
    resolver: ZoneResolver,
    builder: AffinityPatchBuilder,
    config: EngineConfig,
}

impl AdmissionDecisionEngine {
    /// Create a new engine over a shared cluster state reader
    pub fn new(reader: Arc<dyn ClusterStateReader>, config: EngineConfig) -> Self {
        Self {
            resolver: ZoneResolver::new(reader, config.zone_label.clone()),
            builder: AffinityPatchBuilder::new(config.zone_label.clone()),
            config,
        }
    }

    /// Decide on one admission request. Always allows the pod.
    pub async fn decide(&self, input: &AdmissionInput) -> AdmissionDecision {
        let resolution = timeout(
            self.config.resolve_timeout,
            self.resolver.resolve_zones(&input.namespace, &input.volumes),
        )
        .await
        .unwrap_or_else(|_| Err(EngineError::timeout(self.config.resolve_timeout)));

        let zones = match resolution {
            Ok(zones) => zones,
            Err(e) => return Self::degraded(&input.uid, &e),
        };

        if zones.is_empty() {
            debug!(uid = %input.uid, namespace = %input.namespace, "No zones resolved, allowing unchanged");
            return AdmissionDecision::allow(&input.uid);
        }

        let patch = self.builder.build_patch(input.affinity.as_ref(), &zones);

        info!(
            uid = %input.uid,
            namespace = %input.namespace,
            zones = %zones,
            op = %patch[0],
            "Injecting zone affinity"
        );

        AdmissionDecision::patched(&input.uid, patch)
    }

    /// Admit a request the engine could not evaluate, unmodified
    pub fn degraded(uid: &str, err: &EngineError) -> AdmissionDecision {
        warn!(uid = %uid, error = %err, "Admitting pod without zone affinity");
        AdmissionDecision::degraded(uid, err.to_string())
    }
}
