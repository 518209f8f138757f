//! Event routing.
//!
//! The router takes a validated envelope and drives it through the pipeline's
//! back half: one audit record, the production test-traffic gate, then
//! dispatch to exactly one domain processor by data model. Processor failures
//! are business outcomes, not transport errors: they are caught, logged with
//! the originating data model and processing duration, and converted into a
//! `success: false` result. The only error the router propagates is an audit
//! write failure - an unaudited clinical event must never reach the alerting
//! stage, so that maps to HTTP 500 upstream.

mod orders;
mod patient_admin;
mod results;
mod stubs;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Environment;
use crate::store::{AuditRecord, Backend, StoreError};
use crate::types::envelope::{DataModel, WebhookEnvelope};
use crate::types::{PatientId, VisitNumber};

/// Errors the router propagates to its HTTP caller.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The audit record could not be written. Fatal for the request.
    #[error("audit write failed: {0}")]
    Audit(#[source] StoreError),
}

/// Errors internal to domain processors. Caught by the router and surfaced
/// as `success: false` results.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of routing one envelope. Never retried internally; redelivery is
/// the broker's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub success: bool,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<PatientId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_id: Option<VisitNumber>,

    pub alerts_triggered: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_processed: Option<serde_json::Value>,
}

impl ProcessingResult {
    pub fn success(message: impl Into<String>) -> Self {
        ProcessingResult {
            success: true,
            message: message.into(),
            patient_id: None,
            visit_id: None,
            alerts_triggered: 0,
            data_processed: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ProcessingResult {
            success: false,
            ..ProcessingResult::success(message)
        }
    }

    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn with_visit(mut self, visit_id: Option<VisitNumber>) -> Self {
        self.visit_id = visit_id;
        self
    }

    pub fn with_alerts(mut self, alerts_triggered: usize) -> Self {
        self.alerts_triggered = alerts_triggered;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data_processed = Some(data);
        self
    }
}

/// Routes one envelope to its domain processor.
///
/// The caller is expected to have verified the signature and validated the
/// envelope's structure; the router still degrades gracefully (structured
/// failure results, never a panic) if handed something incomplete.
pub async fn route<B: Backend>(
    backend: &B,
    environment: Environment,
    envelope: &WebhookEnvelope,
) -> Result<ProcessingResult, RouterError> {
    let started = Instant::now();

    let Some(meta) = &envelope.meta else {
        return Ok(ProcessingResult::failure("Missing Meta"));
    };

    let data_model_name = meta.data_model.clone().unwrap_or_default();
    let event_type = meta.event_type.clone().unwrap_or_default();
    let facility_code = meta.facility_code.clone().unwrap_or_default();

    // Audit before anything else, including the test-traffic gate: every
    // received event leaves a compliance trail.
    let record = AuditRecord {
        data_model: data_model_name.clone(),
        event_type: event_type.clone(),
        event_date_time: meta.event_date_time.clone(),
        facility_code: facility_code.clone(),
        source_name: meta.source.as_ref().and_then(|s| s.name.clone()),
        received_at: Utc::now(),
        envelope: serde_json::to_value(envelope).unwrap_or(serde_json::Value::Null),
    };
    backend
        .append_audit_record(&record)
        .await
        .map_err(RouterError::Audit)?;

    if meta.test == Some(true) && environment.is_production() {
        info!(
            data_model = %data_model_name,
            event_type = %event_type,
            facility = %facility_code,
            "skipping broker test event in production"
        );
        return Ok(ProcessingResult::success(
            "Test event acknowledged; processing skipped in production",
        ));
    }

    let Some(model) = DataModel::parse(&data_model_name) else {
        warn!(
            data_model = %data_model_name,
            event_type = %event_type,
            "received event for unsupported data model"
        );
        return Ok(ProcessingResult::failure(format!(
            "Unsupported data model: {data_model_name}"
        )));
    };

    let outcome = match model {
        DataModel::PatientAdmin => patient_admin::process(backend, meta, envelope).await,
        DataModel::Results => results::process(backend, meta, envelope).await,
        DataModel::Orders => orders::process(backend, meta, envelope).await,
        DataModel::ClinicalSummary | DataModel::Notes | DataModel::Scheduling => {
            Ok(stubs::process(model))
        }
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(result) => {
            info!(
                data_model = %model,
                event_type = %event_type,
                facility = %facility_code,
                success = result.success,
                alerts_triggered = result.alerts_triggered,
                duration_ms,
                "event routed"
            );
            Ok(result)
        }
        Err(err) => {
            error!(
                data_model = %model,
                event_type = %event_type,
                facility = %facility_code,
                duration_ms,
                error = %err,
                "event processing failed"
            );
            Ok(ProcessingResult::failure(err.to_string()))
        }
    }
}
