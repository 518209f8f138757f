//! Medication-interaction rules for cardiovascular drugs.
//!
//! A fixed keyword table of narrow-therapeutic-index cardiovascular
//! medications, matched case-insensitively against an order's procedure
//! description. A match produces one warning alert.

use serde_json::{Map, json};

use crate::store::AlertStore;
use crate::types::envelope::{Procedure, Provider};
use crate::types::{AlertCategory, AlertType, ClinicalAlert, FacilityCode, PatientId};

use super::persist_alert;

const CARDIOVASCULAR_MEDICATIONS: &[&str] = &[
    "digoxin",
    "warfarin",
    "amiodarone",
    "procainamide",
    "quinidine",
    "flecainide",
    "propafenone",
    "dofetilide",
];

/// Returns the matched medication keyword, if the procedure orders one of the
/// monitored cardiovascular drugs.
fn matched_medication(procedure: &Procedure) -> Option<&'static str> {
    let description = procedure.description.as_deref()?.to_lowercase();
    CARDIOVASCULAR_MEDICATIONS
        .iter()
        .find(|m| description.contains(*m))
        .copied()
}

/// True if the order's procedure is for a monitored cardiovascular
/// medication. The orders processor uses this to decide whether to run the
/// medication rule set at all.
pub fn is_cardiovascular_medication(procedure: &Procedure) -> bool {
    matched_medication(procedure).is_some()
}

/// Evaluates the medication-interaction rule set for one order.
///
/// Returns the produced alerts; each is persisted before being returned.
pub async fn evaluate_medication_rules<A: AlertStore>(
    store: &A,
    patient_id: &PatientId,
    procedure: &Procedure,
    provider: Option<&Provider>,
    facility: &FacilityCode,
) -> Vec<ClinicalAlert> {
    let Some(medication) = matched_medication(procedure) else {
        return Vec::new();
    };

    let mut related = Map::new();
    related.insert("medication".to_string(), json!(medication));
    if let Some(description) = &procedure.description {
        related.insert("procedure".to_string(), json!(description));
    }
    if let Some(code) = &procedure.code {
        related.insert("procedureCode".to_string(), json!(code));
    }
    if let Some(provider) = provider {
        related.insert("orderingProvider".to_string(), json!(provider.display_name()));
    }

    let mut alerts = Vec::new();
    if let Ok(alert) = ClinicalAlert::new(
        AlertType::Warning,
        AlertCategory::Medication,
        3,
        patient_id.clone(),
        facility.clone(),
        format!("Cardiovascular medication ordered: {medication}"),
        false,
        vec![
            "Review active medication list for interactions".to_string(),
            "Verify renal function and recent electrolytes before dosing".to_string(),
        ],
        related,
    ) {
        alerts.push(alert);
    }

    for alert in &alerts {
        persist_alert(store, alert).await;
    }

    alerts
}
