use crate::error::{ClusterError, Result};
use crate::traits::ClusterStateReader;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use kube::api::Api;
use kube::Client;
use tracing::debug;
use zonepin_core::{ClaimRecord, VolumeRecord};

/// Cluster state reader backed by the Kubernetes API
///
/// Wraps a single `kube::Client`, which pools connections and refreshes
/// service account credentials on its own. Cloning the client is cheap.
#[derive(Clone)]
pub struct KubeStateReader {
    client: Client,
}

impl KubeStateReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the in-cluster service account, falling back to the local kubeconfig
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::unavailable(format!("failed to build kube client: {}", e)))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ClusterStateReader for KubeStateReader {
    async fn get_claim(&self, namespace: &str, name: &str) -> Result<ClaimRecord> {
        let key = format!("{}/{}", namespace, name);
        debug!(claim = %key, "GET persistentvolumeclaim");

        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let pvc = api
            .get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, "PersistentVolumeClaim", &key))?;

        Ok(ClaimRecord::from(&pvc))
    }

    async fn get_volume(&self, name: &str) -> Result<VolumeRecord> {
        debug!(volume = %name, "GET persistentvolume");

        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        let pv = api
            .get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, "PersistentVolume", name))?;

        Ok(VolumeRecord::from(&pv))
    }
}
