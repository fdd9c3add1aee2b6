use crate::error::{ClusterError, Result};
use crate::traits::ClusterStateReader;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use zonepin_core::{ClaimRecord, VolumeRecord};

/// A lookup served by `MemoryStateReader`, in call order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookup {
    Claim { namespace: String, name: String },
    Volume { name: String },
}

#[derive(Default)]
struct MemoryState {
    claims: HashMap<(String, String), ClaimRecord>,
    volumes: HashMap<String, VolumeRecord>,
    failing: HashSet<Lookup>,
    unavailable: bool,
    latency: Option<Duration>,
    lookups: Vec<Lookup>,
}

/// In-memory cluster state reader
///
/// Holds claims and volumes in maps and records every lookup so tests can
/// assert which objects were consulted. Failures can be injected per object
/// or for the whole reader.
#[derive(Clone, Default)]
pub struct MemoryStateReader {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStateReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_claim(&self, claim: ClaimRecord) {
        let mut state = self.state.write().await;
        state
            .claims
            .insert((claim.namespace.clone(), claim.name.clone()), claim);
    }

    pub async fn insert_volume(&self, volume: VolumeRecord) {
        let mut state = self.state.write().await;
        state.volumes.insert(volume.name.clone(), volume);
    }

    /// Make every lookup fail with `ClusterError::Unavailable`
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Make lookups of one object fail with an API error
    pub async fn fail_lookup(&self, lookup: Lookup) {
        self.state.write().await.failing.insert(lookup);
    }

    /// Delay every lookup by `latency`
    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = Some(latency);
    }

    /// All lookups served so far
    pub async fn lookups(&self) -> Vec<Lookup> {
        self.state.read().await.lookups.clone()
    }

    /// Names of the volumes looked up so far
    pub async fn volume_lookups(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .lookups
            .iter()
            .filter_map(|l| match l {
                Lookup::Volume { name } => Some(name.clone()),
                Lookup::Claim { .. } => None,
            })
            .collect()
    }

    async fn record(&self, lookup: Lookup) -> Result<()> {
        let latency = {
            let mut state = self.state.write().await;
            state.lookups.push(lookup.clone());
            if state.unavailable {
                return Err(ClusterError::unavailable("memory reader marked unavailable"));
            }
            if state.failing.contains(&lookup) {
                return Err(ClusterError::api_error(
                    500,
                    format!("{:?}", lookup),
                    "injected failure",
                ));
            }
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterStateReader for MemoryStateReader {
    async fn get_claim(&self, namespace: &str, name: &str) -> Result<ClaimRecord> {
        self.record(Lookup::Claim {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
        .await?;

        let state = self.state.read().await;
        let claim = state
            .claims
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| {
                ClusterError::not_found("PersistentVolumeClaim", format!("{}/{}", namespace, name))
            })?;
        debug!("Memory: claim {}/{} is {}", namespace, name, claim.phase);
        Ok(claim)
    }

    async fn get_volume(&self, name: &str) -> Result<VolumeRecord> {
        self.record(Lookup::Volume {
            name: name.to_string(),
        })
        .await?;

        let state = self.state.read().await;
        let volume = state
            .volumes
            .get(name)
            .cloned()
            .ok_or_else(|| ClusterError::not_found("PersistentVolume", name))?;
        debug!("Memory: volume {} has {} labels", name, volume.labels.len());
        Ok(volume)
    }
}
