//! AdmissionReview decoding and encoding
//!
//! The envelope is decoded with a `DynamicObject` payload so the request UID
//! is known before the pod itself is parsed. A pod that fails to parse is
//! then still answered for the right request.

use crate::error::{Result, WebhookError};
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::TypeMeta;
use tracing::warn;
use zonepin_core::{
    from_json_value, to_json_patch, to_json_value, AdmissionDecision, Pod, ZonepinError,
};

/// Decode a request body into an admission request
pub fn decode_review(body: &[u8]) -> Result<AdmissionRequest<DynamicObject>> {
    let review: AdmissionReview<DynamicObject> = serde_json::from_slice(body)
        .map_err(|e| WebhookError::invalid_review(format!("malformed AdmissionReview: {}", e)))?;

    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(e) => return Err(WebhookError::invalid_review(e.to_string())),
    };

    Ok(request)
}

/// The review answering a body that could not be decoded
///
/// No request UID is known, so the response is `invalid` rather than an allow.
pub fn invalid_review(reason: &str) -> AdmissionReview<DynamicObject> {
    let mut response = AdmissionResponse::invalid(reason);
    response.types = TypeMeta {
        api_version: "admission.k8s.io/v1".to_string(),
        kind: "AdmissionReview".to_string(),
    };
    response.into_review()
}

/// Whether the request creates an object. Other operations pass untouched.
pub fn is_create(request: &AdmissionRequest<DynamicObject>) -> bool {
    matches!(request.operation, Operation::Create)
}

/// Parse the pod carried by the request
pub fn extract_pod(request: &AdmissionRequest<DynamicObject>) -> zonepin_core::Result<Pod> {
    if request.kind.kind != "Pod" {
        return Err(ZonepinError::invalid_pod(format!(
            "expected kind Pod, got {}",
            request.kind.kind
        )));
    }

    let object = request
        .object
        .as_ref()
        .ok_or_else(|| ZonepinError::invalid_pod("request carries no object"))?;

    from_json_value(to_json_value(object)?)
}

/// Encode a decision as the response to `request`
///
/// A patch that cannot be serialized is dropped and the pod admitted as is.
pub fn encode_decision(
    request: &AdmissionRequest<DynamicObject>,
    decision: &AdmissionDecision,
) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request);

    if let Some(message) = &decision.message {
        response.result.message = message.clone();
    }

    let Some(ops) = decision.patch.as_ref().filter(|ops| !ops.is_empty()) else {
        return response;
    };

    let patch = match to_json_patch(ops) {
        Ok(patch) => patch,
        Err(e) => {
            warn!(uid = %request.uid, error = %e, "Failed to encode patch, admitting unchanged");
            return unpatched(request, &e.to_string());
        }
    };

    match response.with_patch(patch) {
        Ok(response) => response,
        Err(e) => {
            warn!(uid = %request.uid, error = %e, "Failed to serialize patch, admitting unchanged");
            unpatched(request, &e.to_string())
        }
    }
}

fn unpatched(request: &AdmissionRequest<DynamicObject>, reason: &str) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request);
    response.result.message = format!("zone affinity not applied: {}", reason);
    response
}
