//! Stub processors for data models that are routed but not yet implemented.
//!
//! These return an explicit "implementation pending" success rather than
//! silently dropping the event: the broker sees the delivery as handled, and
//! the audit trail records it.

use crate::types::envelope::DataModel;

use super::ProcessingResult;

pub(super) fn process(model: DataModel) -> ProcessingResult {
    ProcessingResult::success(format!("{model} processed (implementation pending)"))
}
