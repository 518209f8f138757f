//! Persistence collaborator boundary.
//!
//! The pipeline does not own patient, visit, or order records; it hands them
//! to external persistence services. These traits define that boundary as
//! opaque async operations returning success or failure, so the router and
//! rule engine can be exercised against mock or in-memory implementations.
//!
//! All collaborators must be safe for concurrent use: webhook requests are
//! handled concurrently and the pipeline performs no locking of its own.
//! Idempotency under broker redelivery is the collaborator's responsibility,
//! keyed by external identifiers (visit number, order id, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

use crate::types::envelope::{Location, Order, Patient, Visit};
use crate::types::{ClinicalAlert, FacilityCode, PatientId, VisitNumber};

pub mod memory;

pub use memory::InMemoryBackend;

/// Errors from persistence collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced entity does not exist (e.g., discharging an unknown
    /// visit). Callers decide whether this is recoverable.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// The collaborator rejected the write.
    #[error("storage rejected write: {0}")]
    Rejected(String),

    /// The collaborator is unreachable or failed internally.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// One append-only audit entry, written for every event that reaches the
/// router. Carries the full envelope for compliance traceability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub data_model: String,
    pub event_type: String,
    pub event_date_time: Option<String>,
    pub facility_code: String,
    pub source_name: Option<String>,
    pub received_at: DateTime<Utc>,
    /// The full decoded envelope, stored verbatim.
    pub envelope: serde_json::Value,
}

/// Patient, visit, and order persistence.
pub trait PersistenceService {
    /// Upserts patient demographics, idempotent by external identifier.
    fn upsert_patient(
        &self,
        facility: &FacilityCode,
        patient: &Patient,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Creates a visit for an admission or new-patient event.
    fn create_visit(
        &self,
        facility: &FacilityCode,
        patient_id: &PatientId,
        visit: &Visit,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discharges an existing visit, identified by visit number.
    ///
    /// Returns [`StoreError::NotFound`] if the visit is unknown; the caller
    /// treats that as a handled condition, not a crash.
    fn discharge_visit(
        &self,
        facility: &FacilityCode,
        visit_number: &VisitNumber,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Updates a visit's location after a transfer.
    fn transfer_visit(
        &self,
        facility: &FacilityCode,
        visit_number: &VisitNumber,
        location: Option<&Location>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Generic visit update for event types outside the admission state
    /// machine.
    fn update_visit(
        &self,
        facility: &FacilityCode,
        patient_id: &PatientId,
        visit: &Visit,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persists the result set carried by one order.
    fn persist_order_results(
        &self,
        facility: &FacilityCode,
        patient_id: &PatientId,
        order: &Order,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persists one order.
    fn persist_order(
        &self,
        facility: &FacilityCode,
        patient_id: &PatientId,
        order: &Order,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Alert persistence.
///
/// Storage failure is non-fatal for the pipeline: alerts are still counted
/// and returned, persistence is best-effort.
pub trait AlertStore {
    fn store_alert(
        &self,
        alert: &ClinicalAlert,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Append-only audit log.
///
/// Unlike the other collaborators, a write failure here is fatal for the
/// request: no unaudited clinical event may reach the alerting stage.
pub trait AuditSink {
    fn append_audit_record(
        &self,
        record: &AuditRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The full collaborator bundle the router needs.
pub trait Backend: PersistenceService + AlertStore + AuditSink + Send + Sync {}

impl<T: PersistenceService + AlertStore + AuditSink + Send + Sync> Backend for T {}
