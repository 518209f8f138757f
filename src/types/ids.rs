//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! VisitNumber where a PatientId is expected) and make the code more
//! self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A patient identifier as assigned by the source system (e.g., an MRN).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub String);

impl PatientId {
    pub fn new(s: impl Into<String>) -> Self {
        PatientId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PatientId {
    fn from(s: String) -> Self {
        PatientId(s)
    }
}

impl From<&str> for PatientId {
    fn from(s: &str) -> Self {
        PatientId(s.to_string())
    }
}

/// A visit (encounter) number within a facility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitNumber(pub String);

impl VisitNumber {
    pub fn new(s: impl Into<String>) -> Self {
        VisitNumber(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VisitNumber {
    fn from(s: String) -> Self {
        VisitNumber(s)
    }
}

impl From<&str> for VisitNumber {
    fn from(s: &str) -> Self {
        VisitNumber(s.to_string())
    }
}

/// An order identifier as assigned by the placing system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(s: impl Into<String>) -> Self {
        OrderId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        OrderId(s)
    }
}

/// Identifier of the originating care site.
///
/// Used for multi-tenant scoping of alerts and audit records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityCode(pub String);

impl FacilityCode {
    pub fn new(s: impl Into<String>) -> Self {
        FacilityCode(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacilityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FacilityCode {
    fn from(s: String) -> Self {
        FacilityCode(s)
    }
}

impl From<&str> for FacilityCode {
    fn from(s: &str) -> Self {
        FacilityCode(s.to_string())
    }
}

/// A globally unique alert identifier.
///
/// Generated once at alert creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub String);

impl AlertId {
    /// Generates a fresh alert ID.
    ///
    /// Uses a v4 UUID, so collision probability is negligible.
    pub fn generate() -> Self {
        AlertId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_ids_are_unique() {
        let a = AlertId::generate();
        let b = AlertId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn patient_id_display() {
        let id = PatientId::new("MRN-0001");
        assert_eq!(id.to_string(), "MRN-0001");
    }

    #[test]
    fn ids_serialize_transparently() {
        let visit = VisitNumber::new("V123");
        let json = serde_json::to_string(&visit).unwrap();
        assert_eq!(json, "\"V123\"");
    }
}
