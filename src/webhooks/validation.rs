//! Structural payload validation.
//!
//! [`validate`] checks a decoded envelope for structural completeness: a set
//! of base checks applied to every message, plus model-specific rule sets
//! dispatched on `Meta.DataModel`. Validation is a pure function - no I/O,
//! no side effects - and does not short-circuit: every violation is collected
//! so the broker operator can fix them all from a single response.
//!
//! Error strings carry an indexed path to the offending field, e.g.
//! `Results: Missing Orders[2].Results[0].Code`.

use chrono::{DateTime, NaiveDate};

use crate::types::envelope::{DataModel, Meta, Order, Patient, Visit, WebhookEnvelope};

/// Outcome of validating one envelope. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Returns true if the optional string field is present and non-blank.
///
/// The broker sometimes sends empty strings where fields were cleared at the
/// source; those count as missing.
fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Returns true if the field holds a parseable RFC 3339 timestamp.
fn valid_timestamp(field: &Option<String>) -> bool {
    field
        .as_deref()
        .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok())
}

/// Returns true if the field holds a parseable `YYYY-MM-DD` date.
fn valid_date(field: &Option<String>) -> bool {
    field
        .as_deref()
        .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
}

/// Validates an envelope's structural completeness.
///
/// Base checks run for every data model; model-specific checks run for
/// PatientAdmin, Results, and Orders. Other models (and unrecognized model
/// names) get base checks only - the router decides what to do with them.
pub fn validate(envelope: &WebhookEnvelope) -> ValidationResult {
    let mut errors = Vec::new();

    let Some(meta) = &envelope.meta else {
        return ValidationResult::from_errors(vec!["Missing Meta".to_string()]);
    };

    validate_meta(meta, &mut errors);

    if let Some(model) = meta.data_model.as_deref().and_then(DataModel::parse) {
        match model {
            DataModel::PatientAdmin => validate_patient_admin(envelope, &mut errors),
            DataModel::Results => validate_results(envelope, &mut errors),
            DataModel::Orders => validate_orders(envelope, &mut errors),
            // No additional structural requirements; processing is stubbed.
            DataModel::ClinicalSummary | DataModel::Notes | DataModel::Scheduling => {}
        }
    }

    ValidationResult::from_errors(errors)
}

fn validate_meta(meta: &Meta, errors: &mut Vec<String>) {
    if !present(&meta.data_model) {
        errors.push("Missing Meta.DataModel".to_string());
    }
    if !present(&meta.event_type) {
        errors.push("Missing Meta.EventType".to_string());
    }
    if !present(&meta.event_date_time) {
        errors.push("Missing Meta.EventDateTime".to_string());
    } else if !valid_timestamp(&meta.event_date_time) {
        errors.push("Invalid Meta.EventDateTime".to_string());
    }

    match &meta.source {
        None => errors.push("Missing Meta.Source".to_string()),
        Some(source) => {
            if !present(&source.id) {
                errors.push("Missing Meta.Source.ID".to_string());
            }
            if !present(&source.name) {
                errors.push("Missing Meta.Source.Name".to_string());
            }
        }
    }

    if !present(&meta.facility_code) {
        errors.push("Missing Meta.FacilityCode".to_string());
    }
}

fn validate_identifiers(model: DataModel, patient: &Patient, errors: &mut Vec<String>) {
    if patient.identifiers.is_empty() {
        errors.push(format!("{model}: Missing Patient.Identifiers"));
        return;
    }

    for (i, identifier) in patient.identifiers.iter().enumerate() {
        if !present(&identifier.id) {
            errors.push(format!("{model}: Missing Patient.Identifiers[{i}].ID"));
        }
        if !present(&identifier.id_type) {
            errors.push(format!("{model}: Missing Patient.Identifiers[{i}].IDType"));
        }
    }
}

fn validate_patient_admin(envelope: &WebhookEnvelope, errors: &mut Vec<String>) {
    let model = DataModel::PatientAdmin;

    match &envelope.patient {
        None => errors.push(format!("{model}: Missing Patient")),
        Some(patient) => {
            validate_identifiers(model, patient, errors);

            match &patient.demographics {
                None => errors.push(format!("{model}: Missing Patient.Demographics")),
                Some(demo) => {
                    if !present(&demo.first_name) {
                        errors.push(format!("{model}: Missing Patient.Demographics.FirstName"));
                    }
                    if !present(&demo.last_name) {
                        errors.push(format!("{model}: Missing Patient.Demographics.LastName"));
                    }
                    if !present(&demo.dob) {
                        errors.push(format!("{model}: Missing Patient.Demographics.DOB"));
                    } else if !valid_date(&demo.dob) {
                        errors.push(format!("{model}: Invalid Patient.Demographics.DOB"));
                    }
                    if !present(&demo.sex) {
                        errors.push(format!("{model}: Missing Patient.Demographics.Sex"));
                    }
                }
            }
        }
    }

    match &envelope.visit {
        None => errors.push(format!("{model}: Missing Visit")),
        Some(visit) => validate_visit(model, visit, errors),
    }
}

fn validate_visit(model: DataModel, visit: &Visit, errors: &mut Vec<String>) {
    if !present(&visit.visit_number) {
        errors.push(format!("{model}: Missing Visit.VisitNumber"));
    }
    if !present(&visit.patient_class) {
        errors.push(format!("{model}: Missing Visit.PatientClass"));
    }
    if !present(&visit.visit_date_time) {
        errors.push(format!("{model}: Missing Visit.VisitDateTime"));
    } else if !valid_timestamp(&visit.visit_date_time) {
        errors.push(format!("{model}: Invalid Visit.VisitDateTime"));
    }
}

fn validate_results(envelope: &WebhookEnvelope, errors: &mut Vec<String>) {
    let model = DataModel::Results;

    if envelope.patient.is_none() {
        errors.push(format!("{model}: Missing Patient"));
    }

    let orders = envelope.orders.as_deref().unwrap_or_default();
    if orders.is_empty() {
        errors.push(format!("{model}: Missing Orders"));
        return;
    }

    for (i, order) in orders.iter().enumerate() {
        validate_results_order(model, i, order, errors);
    }
}

fn validate_results_order(model: DataModel, i: usize, order: &Order, errors: &mut Vec<String>) {
    if !present(&order.id) {
        errors.push(format!("{model}: Missing Orders[{i}].ID"));
    }

    match &order.procedure {
        None => errors.push(format!("{model}: Missing Orders[{i}].Procedure")),
        Some(procedure) => {
            if !present(&procedure.code) {
                errors.push(format!("{model}: Missing Orders[{i}].Procedure.Code"));
            }
            if !present(&procedure.description) {
                errors.push(format!("{model}: Missing Orders[{i}].Procedure.Description"));
            }
        }
    }

    for (j, result) in order.results.iter().enumerate() {
        if !present(&result.code) {
            errors.push(format!("{model}: Missing Orders[{i}].Results[{j}].Code"));
        }
        if !present(&result.description) {
            errors.push(format!("{model}: Missing Orders[{i}].Results[{j}].Description"));
        }
        if result.value.is_none() {
            errors.push(format!("{model}: Missing Orders[{i}].Results[{j}].Value"));
        }
        if !present(&result.status) {
            errors.push(format!("{model}: Missing Orders[{i}].Results[{j}].Status"));
        }
    }
}

fn validate_orders(envelope: &WebhookEnvelope, errors: &mut Vec<String>) {
    let model = DataModel::Orders;

    if envelope.patient.is_none() {
        errors.push(format!("{model}: Missing Patient"));
    }

    let orders = envelope.orders.as_deref().unwrap_or_default();
    if orders.is_empty() {
        errors.push(format!("{model}: Missing Orders"));
        return;
    }

    for (i, order) in orders.iter().enumerate() {
        if !present(&order.id) {
            errors.push(format!("{model}: Missing Orders[{i}].ID"));
        }
        if !present(&order.transaction_date_time) {
            errors.push(format!("{model}: Missing Orders[{i}].TransactionDateTime"));
        } else if !valid_timestamp(&order.transaction_date_time) {
            errors.push(format!("{model}: Invalid Orders[{i}].TransactionDateTime"));
        }
        if order.provider.is_none() {
            errors.push(format!("{model}: Missing Orders[{i}].Provider"));
        }
        if order.procedure.is_none() {
            errors.push(format!("{model}: Missing Orders[{i}].Procedure"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> WebhookEnvelope {
        serde_json::from_value(value).unwrap()
    }

    fn valid_meta(data_model: &str) -> serde_json::Value {
        json!({
            "DataModel": data_model,
            "EventType": "Arrival",
            "EventDateTime": "2024-03-01T12:00:00Z",
            "Source": { "ID": "src-1", "Name": "Hospital EHR" },
            "FacilityCode": "MERCY-01"
        })
    }

    fn valid_patient() -> serde_json::Value {
        json!({
            "Identifiers": [ { "ID": "MRN-42", "IDType": "MR" } ],
            "Demographics": {
                "FirstName": "Ada",
                "LastName": "Byron",
                "DOB": "1990-12-10",
                "Sex": "Female"
            }
        })
    }

    fn valid_visit() -> serde_json::Value {
        json!({
            "VisitNumber": "V-100",
            "PatientClass": "Inpatient",
            "VisitDateTime": "2024-03-01T11:45:00Z",
            "Location": { "Department": "Medicine" }
        })
    }

    #[test]
    fn missing_meta_is_the_only_error() {
        let result = validate(&WebhookEnvelope::default());
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Missing Meta"]);
    }

    #[test]
    fn base_checks_collect_all_meta_errors() {
        let result = validate(&envelope(json!({ "Meta": {} })));
        assert!(!result.is_valid);
        assert!(result.errors.contains(&"Missing Meta.DataModel".to_string()));
        assert!(result.errors.contains(&"Missing Meta.EventType".to_string()));
        assert!(result.errors.contains(&"Missing Meta.EventDateTime".to_string()));
        assert!(result.errors.contains(&"Missing Meta.Source".to_string()));
        assert!(result.errors.contains(&"Missing Meta.FacilityCode".to_string()));
    }

    #[test]
    fn unparseable_event_datetime_is_invalid() {
        let mut meta = valid_meta("Notes");
        meta["EventDateTime"] = json!("yesterday at noon");
        let result = validate(&envelope(json!({ "Meta": meta })));
        assert_eq!(result.errors, vec!["Invalid Meta.EventDateTime"]);
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let mut meta = valid_meta("Notes");
        meta["FacilityCode"] = json!("   ");
        let result = validate(&envelope(json!({ "Meta": meta })));
        assert_eq!(result.errors, vec!["Missing Meta.FacilityCode"]);
    }

    #[test]
    fn valid_patient_admin_passes() {
        let result = validate(&envelope(json!({
            "Meta": valid_meta("PatientAdmin"),
            "Patient": valid_patient(),
            "Visit": valid_visit()
        })));
        assert!(result.is_valid, "unexpected errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn patient_admin_reports_both_missing_fields() {
        // Missing LastName AND VisitNumber must yield exactly two errors,
        // naming both.
        let mut patient = valid_patient();
        patient["Demographics"]
            .as_object_mut()
            .unwrap()
            .remove("LastName");
        let mut visit = valid_visit();
        visit.as_object_mut().unwrap().remove("VisitNumber");

        let result = validate(&envelope(json!({
            "Meta": valid_meta("PatientAdmin"),
            "Patient": patient,
            "Visit": visit
        })));

        assert_eq!(
            result.errors,
            vec![
                "PatientAdmin: Missing Patient.Demographics.LastName",
                "PatientAdmin: Missing Visit.VisitNumber",
            ]
        );
    }

    #[test]
    fn patient_admin_missing_dob_message() {
        let mut patient = valid_patient();
        patient["Demographics"].as_object_mut().unwrap().remove("DOB");

        let result = validate(&envelope(json!({
            "Meta": valid_meta("PatientAdmin"),
            "Patient": patient,
            "Visit": valid_visit()
        })));

        assert_eq!(
            result.errors,
            vec!["PatientAdmin: Missing Patient.Demographics.DOB"]
        );
    }

    #[test]
    fn patient_admin_invalid_dob_is_distinct_from_missing() {
        let mut patient = valid_patient();
        patient["Demographics"]["DOB"] = json!("12/10/1990");

        let result = validate(&envelope(json!({
            "Meta": valid_meta("PatientAdmin"),
            "Patient": patient,
            "Visit": valid_visit()
        })));

        assert_eq!(
            result.errors,
            vec!["PatientAdmin: Invalid Patient.Demographics.DOB"]
        );
    }

    #[test]
    fn patient_admin_identifier_needs_both_parts() {
        let result = validate(&envelope(json!({
            "Meta": valid_meta("PatientAdmin"),
            "Patient": {
                "Identifiers": [ { "ID": "MRN-42" } ],
                "Demographics": valid_patient()["Demographics"]
            },
            "Visit": valid_visit()
        })));

        assert_eq!(
            result.errors,
            vec!["PatientAdmin: Missing Patient.Identifiers[0].IDType"]
        );
    }

    #[test]
    fn results_requires_patient_and_orders() {
        let result = validate(&envelope(json!({ "Meta": valid_meta("Results") })));
        assert_eq!(
            result.errors,
            vec!["Results: Missing Patient", "Results: Missing Orders"]
        );
    }

    #[test]
    fn results_empty_orders_list_is_missing() {
        let result = validate(&envelope(json!({
            "Meta": valid_meta("Results"),
            "Patient": valid_patient(),
            "Orders": []
        })));
        assert_eq!(result.errors, vec!["Results: Missing Orders"]);
    }

    #[test]
    fn results_errors_carry_indexed_paths() {
        let result = validate(&envelope(json!({
            "Meta": valid_meta("Results"),
            "Patient": valid_patient(),
            "Orders": [
                {
                    "ID": "ORD-1",
                    "Procedure": { "Code": "TROP", "Description": "Troponin I" },
                    "Results": [
                        { "Code": "10839-9", "Description": "Troponin I", "Value": "0.02", "Status": "Final" }
                    ]
                },
                {
                    "ID": "ORD-2",
                    "Procedure": { "Code": "BMP", "Description": "Basic metabolic panel" },
                    "Results": [
                        { "Description": "Potassium", "Status": "Final" }
                    ]
                }
            ]
        })));

        assert_eq!(
            result.errors,
            vec![
                "Results: Missing Orders[1].Results[0].Code",
                "Results: Missing Orders[1].Results[0].Value",
            ]
        );
    }

    #[test]
    fn results_value_empty_string_is_not_missing() {
        // A non-null empty value is structurally present; only null/absent
        // values are reported.
        let result = validate(&envelope(json!({
            "Meta": valid_meta("Results"),
            "Patient": valid_patient(),
            "Orders": [
                {
                    "ID": "ORD-1",
                    "Procedure": { "Code": "TROP", "Description": "Troponin I" },
                    "Results": [
                        { "Code": "10839-9", "Description": "Troponin I", "Value": "", "Status": "Final" }
                    ]
                }
            ]
        })));
        assert!(result.is_valid, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn orders_model_checks_order_fields() {
        let result = validate(&envelope(json!({
            "Meta": valid_meta("Order"),
            "Patient": valid_patient(),
            "Orders": [
                {
                    "TransactionDateTime": "not-a-time",
                    "Procedure": { "Code": "MED-1", "Description": "Digoxin 0.125mg" }
                }
            ]
        })));

        assert_eq!(
            result.errors,
            vec![
                "Orders: Missing Orders[0].ID",
                "Orders: Invalid Orders[0].TransactionDateTime",
                "Orders: Missing Orders[0].Provider",
            ]
        );
    }

    #[test]
    fn other_models_get_base_checks_only() {
        let result = validate(&envelope(json!({ "Meta": valid_meta("Scheduling") })));
        assert!(result.is_valid);

        // Unrecognized model: base checks pass, routing handles the rest.
        let result = validate(&envelope(json!({ "Meta": valid_meta("Flowsheet") })));
        assert!(result.is_valid);
    }
}
