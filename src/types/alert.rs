//! Clinical alert records.
//!
//! Alerts are the output of the rule engine. Once created they are immutable
//! except for the acknowledgement fields, which transition exactly once from
//! unacknowledged to acknowledged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::ids::{AlertId, FacilityCode, PatientId};

/// Alert urgency class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Critical,
    Warning,
    Info,
}

/// Clinical domain the alert belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Cardiac,
    Medication,
    Lab,
    Vitals,
    Clinical,
}

/// Errors from alert state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlertError {
    /// The alert was already acknowledged; the original acknowledger and
    /// timestamp are preserved.
    #[error("alert already acknowledged by {by} at {at}")]
    AlreadyAcknowledged { by: String, at: DateTime<Utc> },

    /// Severity outside the 1..=5 range.
    #[error("invalid severity {0}, must be 1..=5")]
    InvalidSeverity(u8),
}

/// One alert produced by a triggered clinical rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalAlert {
    pub id: AlertId,

    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub category: AlertCategory,

    /// 1..=5, 5 highest.
    pub severity: u8,

    pub patient_id: PatientId,
    pub facility_code: FacilityCode,
    pub triggered_at: DateTime<Utc>,

    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,

    pub action_required: bool,

    /// Fixed recommendation text attached by the triggering rule.
    pub recommendations: Vec<String>,

    /// Opaque traceability blob (triggering values, location, codes).
    /// Attached for audit only; never interpreted by the engine.
    pub related_data: Map<String, Value>,

    /// Human-readable rule description.
    pub message: String,
}

impl ClinicalAlert {
    /// Creates a new unacknowledged alert with a fresh ID.
    ///
    /// Returns an error if `severity` is outside 1..=5.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        alert_type: AlertType,
        category: AlertCategory,
        severity: u8,
        patient_id: PatientId,
        facility_code: FacilityCode,
        message: impl Into<String>,
        action_required: bool,
        recommendations: Vec<String>,
        related_data: Map<String, Value>,
    ) -> Result<Self, AlertError> {
        if !(1..=5).contains(&severity) {
            return Err(AlertError::InvalidSeverity(severity));
        }

        Ok(ClinicalAlert {
            id: AlertId::generate(),
            alert_type,
            category,
            severity,
            patient_id,
            facility_code,
            triggered_at: Utc::now(),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            action_required,
            recommendations,
            related_data,
            message: message.into(),
        })
    }

    /// Acknowledges the alert.
    ///
    /// This is the only mutation an alert permits, and it happens at most
    /// once. A second acknowledgement is rejected and never overwrites the
    /// original acknowledger or timestamp.
    pub fn acknowledge(&mut self, who: impl Into<String>) -> Result<(), AlertError> {
        if self.acknowledged {
            return Err(AlertError::AlreadyAcknowledged {
                // Both fields are set together with `acknowledged`; empty
                // string only if the record was hand-built inconsistently.
                by: self.acknowledged_by.clone().unwrap_or_default(),
                at: self.acknowledged_at.unwrap_or(self.triggered_at),
            });
        }

        self.acknowledged = true;
        self.acknowledged_by = Some(who.into());
        self.acknowledged_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alert() -> ClinicalAlert {
        ClinicalAlert::new(
            AlertType::Critical,
            AlertCategory::Cardiac,
            5,
            PatientId::new("MRN-1"),
            FacilityCode::new("MERCY-01"),
            "Critical troponin elevation",
            true,
            vec!["Activate ACS protocol".into()],
            Map::new(),
        )
        .unwrap()
    }

    #[test]
    fn new_alert_is_unacknowledged() {
        let alert = sample_alert();
        assert!(!alert.acknowledged);
        assert!(alert.acknowledged_by.is_none());
        assert!(alert.acknowledged_at.is_none());
    }

    #[test]
    fn acknowledge_sets_fields_once() {
        let mut alert = sample_alert();
        alert.acknowledge("dr.finch").unwrap();

        assert!(alert.acknowledged);
        assert_eq!(alert.acknowledged_by.as_deref(), Some("dr.finch"));
        assert!(alert.acknowledged_at.is_some());
    }

    #[test]
    fn second_acknowledge_is_rejected_and_preserves_original() {
        let mut alert = sample_alert();
        alert.acknowledge("dr.finch").unwrap();
        let first_at = alert.acknowledged_at;

        let err = alert.acknowledge("dr.other").unwrap_err();
        assert!(matches!(err, AlertError::AlreadyAcknowledged { .. }));

        // Original acknowledgement untouched.
        assert_eq!(alert.acknowledged_by.as_deref(), Some("dr.finch"));
        assert_eq!(alert.acknowledged_at, first_at);
    }

    #[test]
    fn severity_out_of_range_is_rejected() {
        for severity in [0u8, 6, 255] {
            let result = ClinicalAlert::new(
                AlertType::Info,
                AlertCategory::Lab,
                severity,
                PatientId::new("MRN-1"),
                FacilityCode::new("F"),
                "msg",
                false,
                vec![],
                Map::new(),
            );
            assert_eq!(result.unwrap_err(), AlertError::InvalidSeverity(severity));
        }
    }

    #[test]
    fn alert_serializes_type_field() {
        let alert = sample_alert();
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "critical");
        assert_eq!(json["category"], "cardiac");
        assert_eq!(json["severity"], 5);
    }
}
