//! Health and webhook-test endpoints.
//!
//! Operational surface only, not part of the core pipeline contract. The
//! test endpoint lets an integration engineer confirm connectivity and see
//! whether signature verification is active without touching clinical state.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::AppState;
use crate::store::Backend;

/// Health check handler.
///
/// Returns 200 OK with the text "OK"; used by load balancers and liveness
/// probes.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Webhook test handler.
///
/// Echoes the received body and reports configuration status. No signature
/// check, no validation, no side effects.
pub async fn webhook_test_handler<B: Backend + 'static>(
    State(app_state): State<AppState<B>>,
    body: Bytes,
) -> Json<Value> {
    let received: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let verification = if app_state.config().signature_verification_enabled() {
        "enabled"
    } else {
        "disabled"
    };

    Json(json!({
        "status": "ok",
        "signatureVerification": verification,
        "received": received,
    }))
}
