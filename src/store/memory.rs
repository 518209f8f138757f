//! In-memory collaborator backend.
//!
//! Backs the collaborator traits with process-local maps. Used by the default
//! binary wiring and throughout the test suite. Writes are idempotent on
//! external identifiers, matching the contract the pipeline expects from a
//! production persistence service under at-least-once broker delivery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::envelope::{Location, Order, Patient, Visit};
use crate::types::{ClinicalAlert, FacilityCode, PatientId, VisitNumber};

use super::{AlertStore, AuditRecord, AuditSink, PersistenceService, StoreError};

/// A visit as held by the in-memory backend.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitRecord {
    pub patient_id: PatientId,
    pub patient_class: Option<String>,
    pub location: Option<Location>,
    pub discharged: bool,
}

#[derive(Default)]
struct Inner {
    /// Keyed by (facility, patient id).
    patients: Mutex<HashMap<(String, String), Patient>>,
    /// Keyed by (facility, visit number).
    visits: Mutex<HashMap<(String, String), VisitRecord>>,
    /// Keyed by (facility, order id).
    orders: Mutex<HashMap<(String, String), Order>>,
    alerts: Mutex<Vec<ClinicalAlert>>,
    audit: Mutex<Vec<AuditRecord>>,
}

/// Process-local implementation of all collaborator traits.
///
/// Clones share the same underlying storage.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Lock poisoning would mean a panic inside a short critical section that
    // never runs user code; treat it as unrecoverable.
    mutex.lock().expect("in-memory store lock poisoned")
}

impl InMemoryBackend {
    pub fn new() -> Self {
        InMemoryBackend::default()
    }

    /// All alerts stored so far, in insertion order.
    pub fn alerts(&self) -> Vec<ClinicalAlert> {
        lock(&self.inner.alerts).clone()
    }

    /// All audit records, in insertion order.
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        lock(&self.inner.audit).clone()
    }

    /// Looks up a visit by facility and visit number.
    pub fn visit(&self, facility: &FacilityCode, visit_number: &VisitNumber) -> Option<VisitRecord> {
        lock(&self.inner.visits)
            .get(&(facility.0.clone(), visit_number.0.clone()))
            .cloned()
    }

    /// Looks up stored patient demographics.
    pub fn patient(&self, facility: &FacilityCode, patient_id: &PatientId) -> Option<Patient> {
        lock(&self.inner.patients)
            .get(&(facility.0.clone(), patient_id.0.clone()))
            .cloned()
    }

    pub fn order_count(&self) -> usize {
        lock(&self.inner.orders).len()
    }
}

impl PersistenceService for InMemoryBackend {
    async fn upsert_patient(
        &self,
        facility: &FacilityCode,
        patient: &Patient,
    ) -> Result<(), StoreError> {
        let Some(id) = patient.primary_id() else {
            return Err(StoreError::Rejected(
                "patient has no primary identifier".to_string(),
            ));
        };
        lock(&self.inner.patients).insert((facility.0.clone(), id.to_string()), patient.clone());
        Ok(())
    }

    async fn create_visit(
        &self,
        facility: &FacilityCode,
        patient_id: &PatientId,
        visit: &Visit,
    ) -> Result<(), StoreError> {
        let Some(number) = visit.visit_number.clone() else {
            return Err(StoreError::Rejected("visit has no visit number".to_string()));
        };
        lock(&self.inner.visits).insert(
            (facility.0.clone(), number),
            VisitRecord {
                patient_id: patient_id.clone(),
                patient_class: visit.patient_class.clone(),
                location: visit.location.clone(),
                discharged: false,
            },
        );
        Ok(())
    }

    async fn discharge_visit(
        &self,
        facility: &FacilityCode,
        visit_number: &VisitNumber,
    ) -> Result<(), StoreError> {
        let mut visits = lock(&self.inner.visits);
        match visits.get_mut(&(facility.0.clone(), visit_number.0.clone())) {
            Some(record) => {
                record.discharged = true;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: "visit",
                key: visit_number.0.clone(),
            }),
        }
    }

    async fn transfer_visit(
        &self,
        facility: &FacilityCode,
        visit_number: &VisitNumber,
        location: Option<&Location>,
    ) -> Result<(), StoreError> {
        let mut visits = lock(&self.inner.visits);
        match visits.get_mut(&(facility.0.clone(), visit_number.0.clone())) {
            Some(record) => {
                record.location = location.cloned();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: "visit",
                key: visit_number.0.clone(),
            }),
        }
    }

    async fn update_visit(
        &self,
        facility: &FacilityCode,
        patient_id: &PatientId,
        visit: &Visit,
    ) -> Result<(), StoreError> {
        let Some(number) = visit.visit_number.clone() else {
            return Err(StoreError::Rejected("visit has no visit number".to_string()));
        };
        let mut visits = lock(&self.inner.visits);
        let entry = visits
            .entry((facility.0.clone(), number))
            .or_insert_with(|| VisitRecord {
                patient_id: patient_id.clone(),
                patient_class: None,
                location: None,
                discharged: false,
            });
        if visit.patient_class.is_some() {
            entry.patient_class = visit.patient_class.clone();
        }
        if visit.location.is_some() {
            entry.location = visit.location.clone();
        }
        Ok(())
    }

    async fn persist_order_results(
        &self,
        facility: &FacilityCode,
        _patient_id: &PatientId,
        order: &Order,
    ) -> Result<(), StoreError> {
        let key = (
            facility.0.clone(),
            order.id.clone().unwrap_or_default(),
        );
        lock(&self.inner.orders).insert(key, order.clone());
        Ok(())
    }

    async fn persist_order(
        &self,
        facility: &FacilityCode,
        _patient_id: &PatientId,
        order: &Order,
    ) -> Result<(), StoreError> {
        let key = (
            facility.0.clone(),
            order.id.clone().unwrap_or_default(),
        );
        lock(&self.inner.orders).insert(key, order.clone());
        Ok(())
    }
}

impl AlertStore for InMemoryBackend {
    async fn store_alert(&self, alert: &ClinicalAlert) -> Result<(), StoreError> {
        lock(&self.inner.alerts).push(alert.clone());
        Ok(())
    }
}

impl AuditSink for InMemoryBackend {
    async fn append_audit_record(&self, record: &AuditRecord) -> Result<(), StoreError> {
        lock(&self.inner.audit).push(record.clone());
        Ok(())
    }
}
