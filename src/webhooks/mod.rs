//! Webhook authentication and structural validation.
//!
//! The first two stages of the ingestion pipeline: HMAC-SHA256 signature
//! verification over the raw request body, then per-data-model structural
//! validation of the decoded envelope. Both run before any clinical
//! processing or persistence.

pub mod signature;
pub mod validation;

pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_request,
    verify_signature,
};
pub use validation::{ValidationResult, validate};
