use crate::error::Result;
use async_trait::async_trait;
use zonepin_core::{ClaimRecord, VolumeRecord};

/// Read-only access to PersistentVolumeClaims and PersistentVolumes
///
/// One instance is built at startup and shared by every in-flight admission
/// request, so implementations must be safe for concurrent use. Missing
/// objects are reported as `ClusterError::NotFound`; an unreachable or
/// unauthorised backend as `ClusterError::Unavailable`.
#[async_trait]
pub trait ClusterStateReader: Send + Sync {
    /// Fetch the claim `name` in `namespace`
    async fn get_claim(&self, namespace: &str, name: &str) -> Result<ClaimRecord>;

    /// Fetch the cluster-scoped volume `name`
    async fn get_volume(&self, name: &str) -> Result<VolumeRecord>;
}
