//! Cardiovascular clinical rule engine.
//!
//! Three rule sets evaluate incoming clinical data and produce
//! [`ClinicalAlert`](crate::types::ClinicalAlert) records:
//!
//! | Rule set | Input | Trigger |
//! |----------|-------|---------|
//! | [`evaluate_admission_rules`] | visit location + event type | care-unit keywords |
//! | [`evaluate_lab_rules`] | lab result values | numeric thresholds |
//! | [`evaluate_medication_rules`] | order procedure | cardiovascular medication keywords |
//!
//! Each entry point is pure with respect to its inputs except for persisting
//! every produced alert through the [`AlertStore`] collaborator. Persistence
//! failure is logged and does not suppress the alert: generation is the
//! source of truth for the `alertsTriggered` count.

mod admission;
mod lab;
mod medication;

pub use admission::evaluate_admission_rules;
pub use lab::evaluate_lab_rules;
pub use medication::{evaluate_medication_rules, is_cardiovascular_medication};

use tracing::warn;

use crate::store::AlertStore;
use crate::types::ClinicalAlert;

/// Persists one alert, logging (but swallowing) storage failures.
pub(crate) async fn persist_alert<A: AlertStore>(store: &A, alert: &ClinicalAlert) {
    if let Err(error) = store.store_alert(alert).await {
        warn!(
            alert_id = %alert.id,
            patient_id = %alert.patient_id,
            %error,
            "failed to persist alert; alert is still counted"
        );
    }
}
