//! Results processor: persists incoming lab results and runs the lab
//! threshold rules per order.

use serde_json::json;
use tracing::warn;

use crate::rules::evaluate_lab_rules;
use crate::store::Backend;
use crate::types::envelope::{Meta, WebhookEnvelope};
use crate::types::{FacilityCode, PatientId};

use super::{ProcessError, ProcessingResult};

/// Processes a Results event.
///
/// Each order carrying at least one result is persisted and then evaluated
/// against the lab rule set. Processing is best-effort across orders: one
/// order's persistence failure is logged and does not abort the rest, and
/// partial success is visible in the aggregate counts.
pub(super) async fn process<B: Backend>(
    backend: &B,
    meta: &Meta,
    envelope: &WebhookEnvelope,
) -> Result<ProcessingResult, ProcessError> {
    let Some(patient) = &envelope.patient else {
        return Ok(ProcessingResult::failure(
            "Results event requires a Patient section",
        ));
    };
    let orders = envelope.orders.as_deref().unwrap_or_default();
    if orders.is_empty() {
        return Ok(ProcessingResult::failure("Results event carries no orders"));
    }

    let Some(patient_id) = patient.primary_id() else {
        return Ok(ProcessingResult::failure(
            "Results event has no patient identifier",
        ));
    };
    let patient_id = PatientId::new(patient_id);
    let facility = FacilityCode::new(meta.facility_code.clone().unwrap_or_default());

    let mut orders_processed = 0usize;
    let mut total_results = 0usize;
    let mut alerts_triggered = 0usize;

    for order in orders {
        if order.results.is_empty() {
            continue;
        }

        if let Err(error) = backend
            .persist_order_results(&facility, &patient_id, order)
            .await
        {
            warn!(
                order_id = order.id.as_deref().unwrap_or("<none>"),
                facility = %facility,
                %error,
                "failed to persist order results; continuing with remaining orders"
            );
            continue;
        }

        orders_processed += 1;
        total_results += order.results.len();

        let alerts = evaluate_lab_rules(
            backend,
            &patient_id,
            &order.results,
            order.procedure.as_ref(),
            &facility,
        )
        .await;
        alerts_triggered += alerts.len();
    }

    Ok(
        ProcessingResult::success(format!("Processed {orders_processed} order(s)"))
            .with_patient(patient_id)
            .with_alerts(alerts_triggered)
            .with_data(json!({
                "ordersProcessed": orders_processed,
                "totalResults": total_results,
            })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryBackend;
    use crate::types::AlertType;
    use serde_json::json;

    fn envelope(orders: serde_json::Value) -> WebhookEnvelope {
        serde_json::from_value(json!({
            "Meta": {
                "DataModel": "Results",
                "EventType": "NewResult",
                "EventDateTime": "2024-03-01T12:00:00Z",
                "Source": { "ID": "src-1", "Name": "Lab System" },
                "FacilityCode": "MERCY-01"
            },
            "Patient": {
                "Identifiers": [ { "ID": "MRN-42", "IDType": "MR" } ]
            },
            "Orders": orders
        }))
        .unwrap()
    }

    async fn run(backend: &InMemoryBackend, envelope: &WebhookEnvelope) -> ProcessingResult {
        let meta = envelope.meta.clone().unwrap();
        process(backend, &meta, envelope).await.unwrap()
    }

    fn troponin_order(id: &str, value: &str) -> serde_json::Value {
        json!({
            "ID": id,
            "Procedure": { "Code": "TROP", "Description": "Troponin I" },
            "Results": [
                {
                    "Code": "10839-9",
                    "Description": "Troponin I",
                    "Value": value,
                    "Units": "ng/mL",
                    "Status": "Final"
                }
            ]
        })
    }

    #[tokio::test]
    async fn critical_troponin_triggers_one_alert() {
        let backend = InMemoryBackend::new();
        let result = run(&backend, &envelope(json!([troponin_order("ORD-1", "0.05")]))).await;

        assert!(result.success);
        assert_eq!(result.alerts_triggered, 1);
        assert_eq!(result.patient_id, Some(PatientId::new("MRN-42")));

        let alerts = backend.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Critical);
        assert_eq!(alerts[0].severity, 5);
        assert_eq!(alerts[0].facility_code, FacilityCode::new("MERCY-01"));
    }

    #[tokio::test]
    async fn aggregates_across_orders() {
        let backend = InMemoryBackend::new();
        let result = run(
            &backend,
            &envelope(json!([
                troponin_order("ORD-1", "0.05"),
                {
                    "ID": "ORD-2",
                    "Procedure": { "Code": "BMP", "Description": "Basic metabolic panel" },
                    "Results": [
                        { "Code": "2823-3", "Description": "Potassium", "Value": "6.5", "Status": "Final" },
                        { "Code": "2951-2", "Description": "Sodium", "Value": "140", "Status": "Final" }
                    ]
                }
            ])),
        )
        .await;

        assert!(result.success);
        assert_eq!(result.alerts_triggered, 2);
        let data = result.data_processed.unwrap();
        assert_eq!(data["ordersProcessed"], 2);
        assert_eq!(data["totalResults"], 3);
    }

    #[tokio::test]
    async fn orders_without_results_are_skipped() {
        let backend = InMemoryBackend::new();
        let result = run(
            &backend,
            &envelope(json!([
                { "ID": "ORD-1", "Procedure": { "Code": "TROP", "Description": "Troponin I" }, "Results": [] },
                troponin_order("ORD-2", "0.001")
            ])),
        )
        .await;

        assert!(result.success);
        let data = result.data_processed.unwrap();
        assert_eq!(data["ordersProcessed"], 1);
        assert_eq!(data["totalResults"], 1);
        assert_eq!(result.alerts_triggered, 0);
    }

    #[tokio::test]
    async fn missing_patient_section_fails() {
        let backend = InMemoryBackend::new();
        let mut envelope = envelope(json!([troponin_order("ORD-1", "0.05")]));
        envelope.patient = None;

        let meta = envelope.meta.clone().unwrap();
        let result = process(&backend, &meta, &envelope).await.unwrap();

        assert!(!result.success);
        assert!(backend.alerts().is_empty());
    }

    #[tokio::test]
    async fn empty_orders_fails() {
        let backend = InMemoryBackend::new();
        let result = run(&backend, &envelope(json!([]))).await;
        assert!(!result.success);
        assert!(result.message.contains("no orders"));
    }

    #[tokio::test]
    async fn normal_results_persist_without_alerts() {
        let backend = InMemoryBackend::new();
        let result = run(&backend, &envelope(json!([troponin_order("ORD-1", "0.005")]))).await;

        assert!(result.success);
        assert_eq!(result.alerts_triggered, 0);
        assert_eq!(backend.order_count(), 1);
    }
}
