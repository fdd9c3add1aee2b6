use crate::codec::{decode_review, encode_decision, extract_pod, invalid_review, is_create};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use std::sync::Arc;
use tracing::{debug, warn};
use zonepin_engine::{AdmissionDecisionEngine, AdmissionInput};

/// POST /inject
///
/// Always answers 200 with an AdmissionReview. A body that is not a usable
/// review gets an `invalid` response instead of an HTTP error.
pub async fn inject_zone_affinity(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Json<AdmissionReview<DynamicObject>> {
    let request = match decode_review(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Failed to decode admission review");
            return Json(invalid_review(&e.to_string()));
        }
    };

    Json(admit(&state, &request).await.into_review())
}

/// Decide on one decoded admission request
pub async fn admit(
    state: &AppState,
    request: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    if !is_create(request) {
        debug!(uid = %request.uid, operation = ?request.operation, "Not a create, allowing unchanged");
        return AdmissionResponse::from(request);
    }

    let input = extract_pod(request).and_then(|pod| {
        AdmissionInput::from_pod(&request.uid, request.namespace.as_deref(), &pod)
    });

    let decision = match input {
        Ok(input) => state.engine.decide(&input).await,
        Err(e) => AdmissionDecisionEngine::degraded(&request.uid, &e.into()),
    };

    debug!(uid = %request.uid, outcome = %decision.outcome(), "Admission decided");

    encode_decision(request, &decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{pod_json, review_json};
    use serde_json::{json, Value};
    use zonepin_cluster::MemoryStateReader;
    use zonepin_core::{ClaimRecord, VolumeRecord, ZONE_LABEL};
    use zonepin_engine::EngineConfig;

    async fn state_with_claim(claim: &str, pv: &str, zone: &str) -> (AppState, MemoryStateReader) {
        let reader = MemoryStateReader::new();
        reader
            .insert_claim(ClaimRecord::bound("default", claim, pv))
            .await;
        reader
            .insert_volume(VolumeRecord::new(pv).with_label(ZONE_LABEL, zone))
            .await;
        let state = AppState::new(Arc::new(reader.clone()), EngineConfig::default());
        (state, reader)
    }

    fn decode(review: &Value) -> AdmissionRequest<DynamicObject> {
        decode_review(&serde_json::to_vec(review).unwrap()).unwrap()
    }

    fn patch_of(response: &AdmissionResponse) -> Value {
        serde_json::from_slice(response.patch.as_ref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_create_with_zoned_claim_is_patched() {
        let (state, _) = state_with_claim("data", "pv-1", "us-east-1a").await;
        let request = decode(&review_json("CREATE", Some("default"), pod_json(&["data"])));

        let response = admit(&state, &request).await;

        assert!(response.allowed);
        let patch = patch_of(&response);
        assert_eq!(patch[0]["op"], "add");
        assert_eq!(patch[0]["path"], "/spec/affinity");
        assert_eq!(
            patch[0]["value"]["nodeAffinity"]["requiredDuringSchedulingIgnoredDuringExecution"]
                ["nodeSelectorTerms"][0]["matchExpressions"][0],
            json!({"key": ZONE_LABEL, "operator": "In", "values": ["us-east-1a"]})
        );
    }

    #[tokio::test]
    async fn test_existing_required_term_survives_applied_patch() {
        let (state, _) = state_with_claim("data", "pv-1", "eu-west-1a").await;
        let mut pod = pod_json(&["data"]);
        pod["spec"]["affinity"] = json!({
            "nodeAffinity": {
                "requiredDuringSchedulingIgnoredDuringExecution": {
                    "nodeSelectorTerms": [{
                        "matchExpressions": [{"key": "disktype", "operator": "In", "values": ["ssd"]}]
                    }]
                }
            }
        });
        let request = decode(&review_json("CREATE", Some("default"), pod.clone()));

        let response = admit(&state, &request).await;

        let patch: json_patch::Patch =
            serde_json::from_slice(response.patch.as_ref().unwrap()).unwrap();
        json_patch::patch(&mut pod, &patch).unwrap();
        assert_eq!(
            pod["spec"]["affinity"]["nodeAffinity"]["requiredDuringSchedulingIgnoredDuringExecution"]
                ["nodeSelectorTerms"],
            json!([
                {"matchExpressions": [{"key": "disktype", "operator": "In", "values": ["ssd"]}]},
                {"matchExpressions": [{"key": ZONE_LABEL, "operator": "In", "values": ["eu-west-1a"]}]}
            ])
        );
    }

    #[tokio::test]
    async fn test_update_is_allowed_without_lookups() {
        let (state, reader) = state_with_claim("data", "pv-1", "us-east-1a").await;
        let request = decode(&review_json("UPDATE", Some("default"), pod_json(&["data"])));

        let response = admit(&state, &request).await;

        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert!(reader.lookups().await.is_empty());
    }

    #[tokio::test]
    async fn test_pod_namespace_used_when_request_has_none() {
        let (state, _) = state_with_claim("data", "pv-1", "us-east-1a").await;
        let mut pod = pod_json(&["data"]);
        pod["metadata"]["namespace"] = json!("default");
        let request = decode(&review_json("CREATE", None, pod));

        let response = admit(&state, &request).await;

        assert!(response.patch.is_some());
    }

    #[tokio::test]
    async fn test_missing_namespace_degrades() {
        let (state, reader) = state_with_claim("data", "pv-1", "us-east-1a").await;
        let request = decode(&review_json("CREATE", None, pod_json(&["data"])));

        let response = admit(&state, &request).await;

        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert!(response.result.message.contains("no namespace"));
        assert!(reader.lookups().await.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_pod_degrades() {
        let (state, _) = state_with_claim("data", "pv-1", "us-east-1a").await;
        let object = json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web-0"},
            "spec": {"volumes": 42}
        });
        let request = decode(&review_json("CREATE", Some("default"), object));

        let response = admit(&state, &request).await;

        assert!(response.allowed);
        assert_eq!(response.uid, request.uid);
        assert!(response.patch.is_none());
        assert!(!response.result.message.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_cluster_degrades() {
        let (state, reader) = state_with_claim("data", "pv-1", "us-east-1a").await;
        reader.set_unavailable(true).await;
        let request = decode(&review_json("CREATE", Some("default"), pod_json(&["data"])));

        let response = admit(&state, &request).await;

        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert!(response.result.message.contains("unavailable"));
    }
}
