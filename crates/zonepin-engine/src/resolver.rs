use crate::error::{EngineError, Result};
use futures_util::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use zonepin_cluster::{ClusterError, ClusterStateReader};
use zonepin_core::{VolumeReference, ZoneSet};

/// Resolves the zones a pod's storage lives in
///
/// Each PVC-backed volume is followed claim -> bound volume -> zone label.
/// A claim that is missing, unbound, or whose volume cannot be read simply
/// contributes no zone. Only when nothing resolved and the reader itself
/// reported `Unavailable` does resolution fail, so an outage is not mistaken
/// for a pod without storage constraints.
pub struct ZoneResolver {
    reader: Arc<dyn ClusterStateReader>,
    zone_label: String,
}

impl ZoneResolver {
    pub fn new(reader: Arc<dyn ClusterStateReader>, zone_label: impl Into<String>) -> Self {
        Self {
            reader,
            zone_label: zone_label.into(),
        }
    }

    /// Resolve the distinct zones of the claims referenced by `volumes`
    pub async fn resolve_zones(
        &self,
        namespace: &str,
        volumes: &[VolumeReference],
    ) -> Result<ZoneSet> {
        // A claim mounted by several volumes is looked up once
        let claims: BTreeSet<&str> = volumes.iter().filter_map(|v| v.claim_name()).collect();

        if claims.is_empty() {
            debug!("No PVC-backed volumes in namespace {}", namespace);
            return Ok(ZoneSet::new());
        }

        let results = join_all(
            claims
                .iter()
                .map(|claim| self.resolve_claim(namespace, claim)),
        )
        .await;

        let mut zones = ZoneSet::new();
        let mut unavailable = Vec::new();

        for result in results {
            match result {
                Ok(Some(zone)) => {
                    zones.insert(zone);
                }
                Ok(None) => {}
                Err(e) => unavailable.push(e.to_string()),
            }
        }

        if zones.is_empty() && !unavailable.is_empty() {
            return Err(EngineError::reader_unavailable(unavailable.join("; ")));
        }

        debug!(
            "Resolved {} zone(s) {} from {} claim(s) in {}",
            zones.len(),
            zones,
            claims.len(),
            namespace
        );

        Ok(zones)
    }

    /// Follow one claim to its zone
    ///
    /// Returns `Ok(None)` when the claim contributes nothing and `Err` only
    /// when the reader is unavailable.
    async fn resolve_claim(
        &self,
        namespace: &str,
        claim_name: &str,
    ) -> std::result::Result<Option<String>, ClusterError> {
        let claim = match self.reader.get_claim(namespace, claim_name).await {
            Ok(claim) => claim,
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                debug!(claim = %claim_name, error = %e, "Skipping claim");
                return Ok(None);
            }
        };

        let Some(volume_name) = claim.bound_volume() else {
            debug!(claim = %claim_name, phase = %claim.phase, "Claim is not bound, skipping");
            return Ok(None);
        };

        let volume = match self.reader.get_volume(volume_name).await {
            Ok(volume) => volume,
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                debug!(claim = %claim_name, volume = %volume_name, error = %e, "Skipping volume");
                return Ok(None);
            }
        };

        Ok(volume.zone(&self.zone_label).map(str::to_string))
    }
}
