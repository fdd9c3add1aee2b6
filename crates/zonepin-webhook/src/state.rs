use std::sync::Arc;
use zonepin_cluster::ClusterStateReader;
use zonepin_engine::{AdmissionDecisionEngine, EngineConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Decision engine, shared by all in-flight requests
    pub engine: Arc<AdmissionDecisionEngine>,
}

impl AppState {
    /// Create a new AppState over a cluster state reader
    pub fn new(reader: Arc<dyn ClusterStateReader>, config: EngineConfig) -> Self {
        Self {
            engine: Arc::new(AdmissionDecisionEngine::new(reader, config)),
        }
    }
}
