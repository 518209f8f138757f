//! Webhook signature verification using HMAC-SHA256.
//!
//! The EMR broker signs each delivery with a shared secret and sends the
//! digest in the `X-Redox-Signature` header as `sha256=<hex>`. Verification
//! runs against the raw request body, before parsing: a request that fails
//! here is rejected with 401 and never reaches the audit or rule stages.
//!
//! Deployments without a configured secret run in *open mode*: verification
//! is skipped with a loud warning. That is an explicit operational choice for
//! non-production environments, not a fallback.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Parses a signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex, etc.).
/// Never panics.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 signature of a payload using the given secret.
///
/// Used by tests and by the broker-simulation tooling to generate expected
/// signatures.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a broker-style header value ("sha256=<hex>").
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies a webhook signature against the payload and secret.
///
/// Returns `true` if the signature is valid, `false` otherwise - including
/// for malformed headers and length mismatches. Never panics.
///
/// The comparison is constant-time via [`Mac::verify_slice`], so its cost
/// does not depend on the position of the first mismatching byte.
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let expected_signature = match parse_signature_header(signature_header) {
        Some(sig) => sig,
        None => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&expected_signature).is_ok()
}

/// Request-level verification, honoring open mode.
///
/// - No secret configured: logs a warning and accepts the request.
/// - Secret configured, header absent: rejects.
/// - Secret configured, header present: delegates to [`verify_signature`].
pub fn verify_request(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: Option<&[u8]>,
) -> bool {
    let Some(secret) = secret else {
        warn!("webhook signature verification is DISABLED (no secret configured); accepting unauthenticated request");
        return true;
    };

    match signature_header {
        Some(header) => verify_signature(payload, header, secret),
        None => false,
    }
}
