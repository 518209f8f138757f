//! Inbound webhook envelope types.
//!
//! This module defines the typed representation of the EMR broker's webhook
//! payload. The broker delivers one JSON envelope per event: a `Meta` block
//! describing the message, plus optional `Patient`, `Visit`, and `Orders`
//! sections depending on the data model.
//!
//! # Parsing Strategy
//!
//! Every leaf field is `Option` so that deserialization succeeds even for
//! structurally incomplete payloads. Structural completeness is checked
//! separately by the payload validator, which reports *all* missing fields
//! at once instead of failing on the first one.
//!
//! Field names follow the broker's PascalCase wire format (`Meta`,
//! `DataModel`, `FacilityCode`, ...). An envelope is parsed once per HTTP
//! request and is immutable afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The broker's category for a clinical message.
///
/// Drives routing to exactly one domain processor. This is a closed enum:
/// adding a new data model is a compiler-checked change. Strings that match
/// no variant are surfaced by the router as a structured failure, never a
/// panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataModel {
    /// Admissions, discharges, transfers, and demographic updates.
    PatientAdmin,
    /// Lab and diagnostic results.
    Results,
    /// New and updated clinical orders.
    Orders,
    /// Clinical summary documents (not yet processed).
    ClinicalSummary,
    /// Clinical notes (not yet processed).
    Notes,
    /// Scheduling events (not yet processed).
    Scheduling,
}

impl DataModel {
    /// Parses a wire-format data model name.
    ///
    /// Returns `None` for unrecognized names; the caller reports these as
    /// unsupported rather than erroring.
    pub fn parse(s: &str) -> Option<DataModel> {
        match s {
            "PatientAdmin" => Some(DataModel::PatientAdmin),
            "Results" => Some(DataModel::Results),
            "Order" | "Orders" => Some(DataModel::Orders),
            "Clinical Summary" | "ClinicalSummary" => Some(DataModel::ClinicalSummary),
            "Notes" => Some(DataModel::Notes),
            "Scheduling" => Some(DataModel::Scheduling),
            _ => None,
        }
    }

    /// All data models, in routing order.
    pub const ALL: [DataModel; 6] = [
        DataModel::PatientAdmin,
        DataModel::Results,
        DataModel::Orders,
        DataModel::ClinicalSummary,
        DataModel::Notes,
        DataModel::Scheduling,
    ];
}

impl fmt::Display for DataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataModel::PatientAdmin => "PatientAdmin",
            DataModel::Results => "Results",
            DataModel::Orders => "Orders",
            DataModel::ClinicalSummary => "ClinicalSummary",
            DataModel::Notes => "Notes",
            DataModel::Scheduling => "Scheduling",
        };
        write!(f, "{s}")
    }
}

/// The top-level inbound webhook message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct WebhookEnvelope {
    /// Message metadata. Always expected; its absence is a validation error.
    pub meta: Option<Meta>,

    /// Patient section. Required for PatientAdmin, Results, and Orders.
    pub patient: Option<Patient>,

    /// Visit section. Required for PatientAdmin.
    pub visit: Option<Visit>,

    /// Order list. Required (non-empty) for Results and Orders.
    pub orders: Option<Vec<Order>>,
}

/// Message metadata common to every data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Meta {
    /// Data model name (see [`DataModel::parse`]).
    pub data_model: Option<String>,

    /// Event type within the data model (e.g., "Admission", "NewResult").
    /// Free-form; unknown values fall through to generic handling.
    pub event_type: Option<String>,

    /// When the event occurred at the source, RFC 3339.
    pub event_date_time: Option<String>,

    /// Set by the broker for test traffic. Test events must never mutate
    /// production clinical state.
    pub test: Option<bool>,

    /// The sending system.
    pub source: Option<Source>,

    /// Identifier of the originating care site.
    pub facility_code: Option<String>,
}

/// The upstream system that produced the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Source {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Patient section: identifiers plus demographics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Patient {
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
    pub demographics: Option<Demographics>,
}

impl Patient {
    /// The patient's primary identifier (first in the list), if any.
    pub fn primary_id(&self) -> Option<&str> {
        self.identifiers.first().and_then(|i| i.id.as_deref())
    }
}

/// One patient identifier (id + id-type pair, e.g. MRN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Identifier {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "IDType")]
    pub id_type: Option<String>,
}

/// Patient demographics. First/last name, DOB, and sex are required by the
/// validator for PatientAdmin events; the rest are pass-through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Demographics {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(rename = "DOB")]
    pub dob: Option<String>,
    pub sex: Option<String>,
    pub address: Option<serde_json::Value>,
    pub phone_number: Option<serde_json::Value>,
    pub email_addresses: Option<Vec<String>>,
}

/// Visit (encounter) section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Visit {
    pub visit_number: Option<String>,

    /// E.g. "Inpatient", "Outpatient", "Emergency".
    pub patient_class: Option<String>,

    /// When the visit started, RFC 3339.
    pub visit_date_time: Option<String>,

    pub location: Option<Location>,
    pub attending_provider: Option<Provider>,
}

/// A care location within a facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Location {
    pub department: Option<String>,
    pub room: Option<String>,
    pub bed: Option<String>,
}

/// An ordering or attending provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Provider {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub credentials: Option<serde_json::Value>,
}

impl Provider {
    /// Display name for logs and alert traceability.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (None, Some(last)) => last.to_string(),
            (Some(first), None) => first.to_string(),
            (None, None) => self.id.clone().unwrap_or_default(),
        }
    }
}

/// One clinical order, optionally carrying result records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    #[serde(rename = "ID")]
    pub id: Option<String>,

    /// When the order transaction occurred, RFC 3339.
    pub transaction_date_time: Option<String>,

    pub provider: Option<Provider>,
    pub procedure: Option<Procedure>,

    #[serde(default)]
    pub results: Vec<LabResult>,
}

/// The procedure an order is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Procedure {
    pub code: Option<String>,
    pub codeset: Option<String>,
    pub description: Option<String>,
}

/// One result record on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct LabResult {
    pub code: Option<String>,
    pub description: Option<String>,

    /// The result value as transmitted. Numeric rule evaluation parses this
    /// string; non-numeric values are skipped.
    pub value: Option<String>,

    pub value_type: Option<String>,
    pub units: Option<String>,

    /// Reference range as sent by the source (string or structured object).
    pub reference_range: Option<serde_json::Value>,

    pub abnormal_flag: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_model_parse_known_names() {
        assert_eq!(DataModel::parse("PatientAdmin"), Some(DataModel::PatientAdmin));
        assert_eq!(DataModel::parse("Results"), Some(DataModel::Results));
        assert_eq!(DataModel::parse("Order"), Some(DataModel::Orders));
        assert_eq!(DataModel::parse("Scheduling"), Some(DataModel::Scheduling));
        assert_eq!(DataModel::parse("Clinical Summary"), Some(DataModel::ClinicalSummary));
    }

    #[test]
    fn data_model_parse_unknown_is_none() {
        assert_eq!(DataModel::parse("Flowsheet"), None);
        assert_eq!(DataModel::parse(""), None);
        assert_eq!(DataModel::parse("results"), None);
    }

    #[test]
    fn envelope_deserializes_pascal_case() {
        let payload = json!({
            "Meta": {
                "DataModel": "Results",
                "EventType": "NewResult",
                "EventDateTime": "2024-03-01T12:00:00Z",
                "Test": false,
                "Source": { "ID": "src-1", "Name": "Lab System" },
                "FacilityCode": "MERCY-01"
            },
            "Patient": {
                "Identifiers": [ { "ID": "MRN-42", "IDType": "MR" } ]
            },
            "Orders": [
                {
                    "ID": "ORD-1",
                    "Procedure": { "Code": "TROP", "Description": "Troponin I" },
                    "Results": [
                        {
                            "Code": "10839-9",
                            "Description": "Troponin I",
                            "Value": "0.02",
                            "Units": "ng/mL",
                            "Status": "Final"
                        }
                    ]
                }
            ]
        });

        let envelope: WebhookEnvelope = serde_json::from_value(payload).unwrap();
        let meta = envelope.meta.unwrap();
        assert_eq!(meta.data_model.as_deref(), Some("Results"));
        assert_eq!(meta.facility_code.as_deref(), Some("MERCY-01"));
        assert_eq!(envelope.patient.unwrap().primary_id(), Some("MRN-42"));
        let orders = envelope.orders.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].results[0].value.as_deref(), Some("0.02"));
    }

    #[test]
    fn envelope_tolerates_missing_sections() {
        let envelope: WebhookEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.meta.is_none());
        assert!(envelope.patient.is_none());
        assert!(envelope.visit.is_none());
        assert!(envelope.orders.is_none());
    }

    #[test]
    fn provider_display_name() {
        let provider = Provider {
            first_name: Some("Pat".into()),
            last_name: Some("Granger".into()),
            ..Provider::default()
        };
        assert_eq!(provider.display_name(), "Pat Granger");

        let id_only = Provider {
            id: Some("NPI-7".into()),
            ..Provider::default()
        };
        assert_eq!(id_only.display_name(), "NPI-7");
    }

    #[test]
    fn reference_range_accepts_object_or_string() {
        let object: LabResult = serde_json::from_value(json!({
            "Code": "2823-3",
            "ReferenceRange": { "Low": 3.5, "High": 5.5 }
        }))
        .unwrap();
        assert!(object.reference_range.is_some());

        let string: LabResult = serde_json::from_value(json!({
            "Code": "2823-3",
            "ReferenceRange": "3.5-5.5"
        }))
        .unwrap();
        assert!(string.reference_range.is_some());
    }
}
