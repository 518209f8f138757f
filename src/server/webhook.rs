//! Webhook endpoint handler.
//!
//! Composes the pipeline stages in sequence for one request: signature
//! verification over the raw body, JSON decode, structural validation,
//! then audit-and-route. The broker sees exactly four status codes:
//!
//! - 200 - envelope accepted and routed (business failures included:
//!   `success: false` in the body is not a transport error, and the broker
//!   must not retry a structurally-unprocessable payload forever)
//! - 400 - malformed JSON or failed structural validation, with the full
//!   itemized error list
//! - 401 - signature verification failed
//! - 500 - audit write failure only

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use crate::router::{ProcessingResult, RouterError, route};
use crate::store::Backend;
use crate::types::WebhookEnvelope;
use crate::webhooks::{validate, verify_request};

/// Header carrying the broker's HMAC-SHA256 signature.
const HEADER_SIGNATURE: &str = "x-redox-signature";

/// Errors that terminate webhook processing before a 200 response.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// The body is not valid JSON.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The envelope failed structural validation.
    #[error("invalid payload ({} error(s))", .0.len())]
    InvalidPayload(Vec<String>),

    /// The audit record could not be written. An unaudited clinical event
    /// must not be processed, so this is fatal for the request.
    #[error(transparent)]
    Router(#[from] RouterError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid signature" })),
            )
                .into_response(),
            WebhookError::InvalidJson(err) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid payload",
                    "details": [err.to_string()],
                })),
            )
                .into_response(),
            WebhookError::InvalidPayload(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid payload",
                    "details": details,
                })),
            )
                .into_response(),
            // No stack traces or internal identifiers leave the server.
            WebhookError::Router(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Internal server error",
                })),
            )
                .into_response(),
        }
    }
}

/// Successful response body: routing outcome plus timing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub result: ProcessingResult,
    pub processing_time_ms: u64,
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST, body: JSON envelope (≤ 10 MB)
/// - Required header `X-Redox-Signature: sha256=<hex-hmac>` unless no secret
///   is configured (open mode)
pub async fn webhook_handler<B: Backend + 'static>(
    State(app_state): State<AppState<B>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let started = Instant::now();

    // Verify against the raw body, before parsing: malicious requests are
    // rejected without spending work on them.
    let signature = headers.get(HEADER_SIGNATURE).and_then(|v| v.to_str().ok());
    if !verify_request(&body, signature, app_state.webhook_secret()) {
        warn!(
            header_present = signature.is_some(),
            "webhook signature verification failed"
        );
        return Err(WebhookError::InvalidSignature);
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)?;

    let validation = validate(&envelope);
    if !validation.is_valid {
        debug!(
            errors = ?validation.errors,
            "webhook envelope failed structural validation"
        );
        return Err(WebhookError::InvalidPayload(validation.errors));
    }

    let result = route(app_state.backend(), app_state.environment(), &envelope).await?;

    Ok(Json(WebhookResponse {
        status: "success",
        result,
        processing_time_ms: started.elapsed().as_millis() as u64,
    }))
}
