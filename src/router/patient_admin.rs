//! PatientAdmin processor: demographics upserts and the visit state machine.

use tracing::warn;

use crate::rules::evaluate_admission_rules;
use crate::store::{Backend, StoreError};
use crate::types::envelope::{Meta, WebhookEnvelope};
use crate::types::{FacilityCode, PatientId, VisitNumber};

use super::{ProcessError, ProcessingResult};

/// Processes a PatientAdmin event.
///
/// Requires both the patient and visit sections; without them it fails
/// before any side effect. Visit handling is keyed by event type:
///
/// - `Admission` | `NewPatient` - create visit
/// - `Discharge` - discharge existing visit ("not found" is handled, not fatal)
/// - `Transfer` - update visit location
/// - anything else - generic visit update
pub(super) async fn process<B: Backend>(
    backend: &B,
    meta: &Meta,
    envelope: &WebhookEnvelope,
) -> Result<ProcessingResult, ProcessError> {
    let (Some(patient), Some(visit)) = (&envelope.patient, &envelope.visit) else {
        return Ok(ProcessingResult::failure(
            "PatientAdmin event requires Patient and Visit sections",
        ));
    };

    let Some(patient_id) = patient.primary_id() else {
        return Ok(ProcessingResult::failure(
            "PatientAdmin event has no patient identifier",
        ));
    };
    let patient_id = PatientId::new(patient_id);
    let facility = FacilityCode::new(meta.facility_code.clone().unwrap_or_default());
    let event_type = meta.event_type.as_deref().unwrap_or_default();
    let visit_number = visit.visit_number.as_deref().map(VisitNumber::new);

    backend.upsert_patient(&facility, patient).await?;

    let mut message = format!("PatientAdmin {event_type} processed");
    match event_type {
        "Admission" | "NewPatient" => {
            backend.create_visit(&facility, &patient_id, visit).await?;
        }
        "Discharge" => {
            let Some(number) = &visit_number else {
                return Ok(ProcessingResult::failure(
                    "Discharge event has no visit number",
                ));
            };
            match backend.discharge_visit(&facility, number).await {
                Ok(()) => {}
                Err(StoreError::NotFound { .. }) => {
                    warn!(
                        visit_number = %number,
                        facility = %facility,
                        "discharge for unknown visit; demographics updated, visit skipped"
                    );
                    message = format!("PatientAdmin {event_type} processed (visit not found)");
                }
                Err(err) => return Err(err.into()),
            }
        }
        "Transfer" => {
            let Some(number) = &visit_number else {
                return Ok(ProcessingResult::failure(
                    "Transfer event has no visit number",
                ));
            };
            backend
                .transfer_visit(&facility, number, visit.location.as_ref())
                .await?;
        }
        _ => {
            backend.update_visit(&facility, &patient_id, visit).await?;
        }
    }

    let alerts = evaluate_admission_rules(
        backend,
        &patient_id,
        visit_number.as_ref(),
        event_type,
        visit.patient_class.as_deref(),
        visit.location.as_ref(),
        &facility,
    )
    .await;

    Ok(ProcessingResult::success(message)
        .with_patient(patient_id)
        .with_visit(visit_number)
        .with_alerts(alerts.len()))
}
