//! Orders processor: persists new orders and runs the medication rules for
//! cardiovascular drug orders.

use serde_json::json;
use tracing::warn;

use crate::rules::{evaluate_medication_rules, is_cardiovascular_medication};
use crate::store::Backend;
use crate::types::envelope::{Meta, WebhookEnvelope};
use crate::types::{FacilityCode, PatientId};

use super::{ProcessError, ProcessingResult};

/// Processes an Orders event.
///
/// Every order is persisted; orders whose procedure matches the
/// cardiovascular medication table additionally go through the medication
/// rule set. Best-effort across orders, like the results processor.
pub(super) async fn process<B: Backend>(
    backend: &B,
    meta: &Meta,
    envelope: &WebhookEnvelope,
) -> Result<ProcessingResult, ProcessError> {
    let Some(patient) = &envelope.patient else {
        return Ok(ProcessingResult::failure(
            "Orders event requires a Patient section",
        ));
    };
    let orders = envelope.orders.as_deref().unwrap_or_default();
    if orders.is_empty() {
        return Ok(ProcessingResult::failure("Orders event carries no orders"));
    }

    let Some(patient_id) = patient.primary_id() else {
        return Ok(ProcessingResult::failure(
            "Orders event has no patient identifier",
        ));
    };
    let patient_id = PatientId::new(patient_id);
    let facility = FacilityCode::new(meta.facility_code.clone().unwrap_or_default());

    let mut orders_processed = 0usize;
    let mut alerts_triggered = 0usize;

    for order in orders {
        if let Err(error) = backend.persist_order(&facility, &patient_id, order).await {
            warn!(
                order_id = order.id.as_deref().unwrap_or("<none>"),
                facility = %facility,
                %error,
                "failed to persist order; continuing with remaining orders"
            );
            continue;
        }
        orders_processed += 1;

        if let Some(procedure) = &order.procedure {
            if is_cardiovascular_medication(procedure) {
                let alerts = evaluate_medication_rules(
                    backend,
                    &patient_id,
                    procedure,
                    order.provider.as_ref(),
                    &facility,
                )
                .await;
                alerts_triggered += alerts.len();
            }
        }
    }

    Ok(
        ProcessingResult::success(format!("Processed {orders_processed} order(s)"))
            .with_patient(patient_id)
            .with_alerts(alerts_triggered)
            .with_data(json!({ "ordersProcessed": orders_processed })),
    )
}
