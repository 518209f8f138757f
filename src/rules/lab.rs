//! Lab threshold rules for cardiovascular analytes.
//!
//! Values are parsed from the result's string value; non-numeric values are
//! skipped without error. Analytes are identified either by LOINC-style code
//! membership or by a case-insensitive keyword in the result description.
//! Each matched analyte is evaluated independently per result, so a single
//! order can raise multiple alerts.
//!
//! Critical thresholds take precedence: a value meeting the critical bound
//! raises only the critical alert, never a duplicate elevated alert.

use serde_json::{Map, json};

use crate::store::AlertStore;
use crate::types::envelope::{LabResult, Procedure};
use crate::types::{AlertCategory, AlertType, ClinicalAlert, FacilityCode, PatientId};

use super::persist_alert;

/// Troponin I elevation threshold (ng/mL), 99th-percentile cutoff.
const TROPONIN_ELEVATED: f64 = 0.014;
/// Troponin I critical threshold (ng/mL).
const TROPONIN_CRITICAL: f64 = 0.04;
/// BNP critical threshold (pg/mL).
const BNP_CRITICAL: f64 = 400.0;
/// NT-proBNP critical threshold (pg/mL).
const NT_PROBNP_CRITICAL: f64 = 1800.0;
/// Potassium critical bounds (mmol/L). Values outside [3.5, 5.5] but within
/// these bounds are abnormal-but-not-alerted.
const POTASSIUM_CRITICAL_LOW: f64 = 3.0;
const POTASSIUM_CRITICAL_HIGH: f64 = 6.0;

const TROPONIN_I_CODES: &[&str] = &["10839-9", "42757-5", "49563-0", "89579-7"];
const BNP_CODES: &[&str] = &["30934-4", "42637-9"];
const NT_PROBNP_CODES: &[&str] = &["33762-6", "83107-3"];
const POTASSIUM_CODES: &[&str] = &["2823-3", "6298-4"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Analyte {
    TroponinI,
    Bnp,
    NtProBnp,
    Potassium,
}

impl Analyte {
    fn name(self) -> &'static str {
        match self {
            Analyte::TroponinI => "Troponin I",
            Analyte::Bnp => "BNP",
            Analyte::NtProBnp => "NT-proBNP",
            Analyte::Potassium => "Potassium",
        }
    }
}

/// Identifies the analyte a result reports, by code or description keyword.
///
/// NT-proBNP is checked before BNP: "nt-probnp" contains "bnp" as a
/// substring, and the two have different thresholds.
fn identify_analyte(result: &LabResult) -> Option<Analyte> {
    if let Some(code) = result.code.as_deref() {
        if TROPONIN_I_CODES.contains(&code) {
            return Some(Analyte::TroponinI);
        }
        if NT_PROBNP_CODES.contains(&code) {
            return Some(Analyte::NtProBnp);
        }
        if BNP_CODES.contains(&code) {
            return Some(Analyte::Bnp);
        }
        if POTASSIUM_CODES.contains(&code) {
            return Some(Analyte::Potassium);
        }
    }

    let description = result.description.as_deref()?.to_lowercase();
    if description.contains("troponin") {
        return Some(Analyte::TroponinI);
    }
    if description.contains("nt-probnp") || description.contains("pro-bnp") {
        return Some(Analyte::NtProBnp);
    }
    if description.contains("bnp") || description.contains("natriuretic") {
        return Some(Analyte::Bnp);
    }
    if description.contains("potassium") {
        return Some(Analyte::Potassium);
    }
    None
}

/// Parses the result value as a number. Non-numeric values yield `None`.
fn numeric_value(result: &LabResult) -> Option<f64> {
    result.value.as_deref()?.trim().parse().ok()
}

struct Finding {
    alert_type: AlertType,
    severity: u8,
    message: String,
}

/// Applies the threshold table to one (analyte, value) pair.
fn apply_thresholds(analyte: Analyte, value: f64, units: Option<&str>) -> Option<Finding> {
    let with_units = |v: f64| match units {
        Some(units) => format!("{v} {units}"),
        None => v.to_string(),
    };

    match analyte {
        Analyte::TroponinI => {
            if value >= TROPONIN_CRITICAL {
                Some(Finding {
                    alert_type: AlertType::Critical,
                    severity: 5,
                    message: format!("Critical Troponin I elevation: {}", with_units(value)),
                })
            } else if value >= TROPONIN_ELEVATED {
                Some(Finding {
                    alert_type: AlertType::Warning,
                    severity: 4,
                    message: format!("Elevated Troponin I: {}", with_units(value)),
                })
            } else {
                None
            }
        }
        Analyte::Bnp => (value >= BNP_CRITICAL).then(|| Finding {
            alert_type: AlertType::Critical,
            severity: 5,
            message: format!("Critical BNP elevation: {}", with_units(value)),
        }),
        Analyte::NtProBnp => (value >= NT_PROBNP_CRITICAL).then(|| Finding {
            alert_type: AlertType::Critical,
            severity: 5,
            message: format!("Critical NT-proBNP elevation: {}", with_units(value)),
        }),
        Analyte::Potassium => {
            (value < POTASSIUM_CRITICAL_LOW || value > POTASSIUM_CRITICAL_HIGH).then(|| Finding {
                alert_type: AlertType::Critical,
                severity: 5,
                message: format!("Critical potassium: {}", with_units(value)),
            })
        }
    }
}

fn recommendations_for(analyte: Analyte, alert_type: AlertType) -> Vec<String> {
    match (analyte, alert_type) {
        (Analyte::TroponinI, AlertType::Critical) => vec![
            "Activate ACS protocol".to_string(),
            "Obtain 12-lead ECG immediately".to_string(),
            "Repeat troponin in 3 hours".to_string(),
        ],
        (Analyte::TroponinI, _) => vec![
            "Obtain 12-lead ECG".to_string(),
            "Repeat troponin in 3-6 hours to establish trend".to_string(),
        ],
        (Analyte::Bnp, _) | (Analyte::NtProBnp, _) => vec![
            "Assess volume status and respiratory effort".to_string(),
            "Consider echocardiogram if not recently performed".to_string(),
        ],
        (Analyte::Potassium, _) => vec![
            "Obtain ECG to assess for conduction changes".to_string(),
            "Repeat basic metabolic panel to confirm".to_string(),
            "Review potassium-affecting medications".to_string(),
        ],
    }
}

/// Evaluates the lab-threshold rule set against one order's results.
///
/// Returns the produced alerts; each is persisted before being returned.
pub async fn evaluate_lab_rules<A: AlertStore>(
    store: &A,
    patient_id: &PatientId,
    results: &[LabResult],
    procedure: Option<&Procedure>,
    facility: &FacilityCode,
) -> Vec<ClinicalAlert> {
    let mut alerts = Vec::new();

    for result in results {
        let Some(analyte) = identify_analyte(result) else {
            continue;
        };
        let Some(value) = numeric_value(result) else {
            continue;
        };
        let Some(finding) = apply_thresholds(analyte, value, result.units.as_deref()) else {
            continue;
        };

        let mut related = Map::new();
        related.insert("analyte".to_string(), json!(analyte.name()));
        related.insert("value".to_string(), json!(value));
        if let Some(code) = &result.code {
            related.insert("code".to_string(), json!(code));
        }
        if let Some(units) = &result.units {
            related.insert("units".to_string(), json!(units));
        }
        if let Some(procedure) = procedure {
            if let Some(description) = &procedure.description {
                related.insert("procedure".to_string(), json!(description));
            }
        }

        let recommendations = recommendations_for(analyte, finding.alert_type);
        if let Ok(alert) = ClinicalAlert::new(
            finding.alert_type,
            match analyte {
                Analyte::Potassium => AlertCategory::Lab,
                _ => AlertCategory::Cardiac,
            },
            finding.severity,
            patient_id.clone(),
            facility.clone(),
            finding.message,
            finding.alert_type == AlertType::Critical,
            recommendations,
            related,
        ) {
            alerts.push(alert);
        }
    }

    for alert in &alerts {
        persist_alert(store, alert).await;
    }

    alerts
}
