//! Admission and location-based rules.
//!
//! Matches the visit's department string against care-unit keyword tables.
//! The three checks are independent: a single event can raise more than one
//! alert (e.g. an admission to a coronary care unit).

use serde_json::{Map, Value, json};

use crate::store::AlertStore;
use crate::types::envelope::Location;
use crate::types::{AlertCategory, AlertType, ClinicalAlert, FacilityCode, PatientId, VisitNumber};

use super::persist_alert;

/// Cardiac-unit department keywords (substring match).
const CARDIAC_UNIT_KEYWORDS: &[&str] =
    &["cardiology", "cardiac", "heart", "cath lab", "catheterization"];

/// Intensive/coronary-care department keywords (substring match).
const INTENSIVE_CARE_KEYWORDS: &[&str] =
    &["icu", "ccu", "intensive care", "coronary care", "critical care"];

/// Emergency-department keywords (substring match).
const EMERGENCY_KEYWORDS: &[&str] = &["emergency", "trauma"];

/// Two-letter emergency abbreviations. Matched as whole words only, so
/// departments like "Pediatrics" do not false-positive on "ed".
const EMERGENCY_ABBREVIATIONS: &[&str] = &["ed", "er"];

fn matches_any_substring(department: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| department.contains(k))
}

fn matches_any_word(department: &str, keywords: &[&str]) -> bool {
    department
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| keywords.contains(&word))
}

/// Evaluates the location/admission rule set for one visit event.
///
/// All matching is case-insensitive against the visit's department string.
/// Returns the produced alerts; each is persisted before being returned.
#[allow(clippy::too_many_arguments)]
pub async fn evaluate_admission_rules<A: AlertStore>(
    store: &A,
    patient_id: &PatientId,
    visit_number: Option<&VisitNumber>,
    event_type: &str,
    patient_class: Option<&str>,
    location: Option<&Location>,
    facility: &FacilityCode,
) -> Vec<ClinicalAlert> {
    let department = location
        .and_then(|l| l.department.as_deref())
        .unwrap_or_default()
        .to_lowercase();

    if department.is_empty() {
        return Vec::new();
    }

    let related = |extra: &[(&str, Value)]| -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("department".to_string(), json!(department));
        map.insert("eventType".to_string(), json!(event_type));
        if let Some(visit) = visit_number {
            map.insert("visitNumber".to_string(), json!(visit.as_str()));
        }
        for (key, value) in extra {
            map.insert((*key).to_string(), value.clone());
        }
        map
    };

    let mut alerts = Vec::new();

    if matches_any_substring(&department, CARDIAC_UNIT_KEYWORDS) && event_type == "Admission" {
        if let Ok(alert) = ClinicalAlert::new(
            AlertType::Info,
            AlertCategory::Cardiac,
            3,
            patient_id.clone(),
            facility.clone(),
            "Patient admitted to cardiac unit",
            false,
            vec![
                "Review cardiac history and home medications".to_string(),
                "Confirm telemetry monitoring is ordered".to_string(),
            ],
            related(&[]),
        ) {
            alerts.push(alert);
        }
    }

    if matches_any_substring(&department, INTENSIVE_CARE_KEYWORDS)
        && patient_class == Some("Inpatient")
    {
        if let Ok(alert) = ClinicalAlert::new(
            AlertType::Warning,
            AlertCategory::Clinical,
            4,
            patient_id.clone(),
            facility.clone(),
            "Inpatient in intensive/coronary care unit",
            true,
            vec![
                "Verify code status is documented".to_string(),
                "Review hemodynamic monitoring orders".to_string(),
            ],
            related(&[("patientClass", json!(patient_class))]),
        ) {
            alerts.push(alert);
        }
    }

    if matches_any_substring(&department, EMERGENCY_KEYWORDS)
        || matches_any_word(&department, EMERGENCY_ABBREVIATIONS)
    {
        if let Ok(alert) = ClinicalAlert::new(
            AlertType::Warning,
            AlertCategory::Clinical,
            4,
            patient_id.clone(),
            facility.clone(),
            "Patient in emergency department",
            true,
            vec![
                "Obtain 12-lead ECG within 10 minutes if chest pain is reported".to_string(),
                "Review triage vital signs".to_string(),
            ],
            related(&[]),
        ) {
            alerts.push(alert);
        }
    }

    for alert in &alerts {
        persist_alert(store, alert).await;
    }

    alerts
}
