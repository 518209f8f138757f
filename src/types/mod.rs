//! Core domain types for the clinical event pipeline.
//!
//! This module contains the fundamental types used throughout the application,
//! designed to encode invariants via the type system.

pub mod alert;
pub mod envelope;
pub mod ids;

// Re-export commonly used types at the module level
pub use alert::{AlertCategory, AlertError, AlertType, ClinicalAlert};
pub use envelope::{
    DataModel, Demographics, Identifier, LabResult, Location, Meta, Order, Patient, Procedure,
    Provider, Source, Visit, WebhookEnvelope,
};
pub use ids::{AlertId, FacilityCode, OrderId, PatientId, VisitNumber};
