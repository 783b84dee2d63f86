//! Lifecycle guard for sample updates.
//!
//! A sample moves `created -> received -> results entered -> finalized`.
//! `received` and `isFinalized` only ever go from false to true, a sample
//! needs at least one results row before it can be finalized, and a
//! finalized sample is read-only.

use super::models::SampleUpdate;
use crate::common::errors::BusinessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleState {
    pub received: bool,
    pub is_finalized: bool,
    pub result_rows: usize,
}

/// What an accepted update is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdatePlan {
    /// Apply the plain record fields carried by the update
    pub apply_fields: bool,
    pub mark_received: bool,
    pub replace_results: bool,
    pub finalize: bool,
}

impl UpdatePlan {
    pub fn is_noop(&self) -> bool {
        *self == UpdatePlan::default()
    }
}

pub fn plan_update(state: &LifecycleState, update: &SampleUpdate) -> Result<UpdatePlan, BusinessError> {
    if state.is_finalized {
        if update.is_finalized == Some(false) {
            return Err(BusinessError::rule(
                "sample_finalized",
                "A finalized sample cannot be reopened",
            ));
        }
        if update.has_changes_besides_finalize() {
            return Err(BusinessError::rule(
                "sample_finalized",
                "A finalized sample cannot be edited",
            ));
        }
        // Repeated finalize
        return Ok(UpdatePlan::default());
    }

    let mark_received = match update.received {
        Some(false) if state.received => {
            return Err(BusinessError::rule(
                "received_irreversible",
                "A received sample cannot be marked as not received",
            ));
        }
        Some(true) => !state.received,
        _ => false,
    };

    let replace_results = update.results.is_some();
    let result_rows = update
        .results
        .as_ref()
        .map_or(state.result_rows, Vec::len);

    let finalize = update.is_finalized == Some(true);
    if finalize && result_rows == 0 {
        return Err(BusinessError::rule(
            "results_required",
            "Add at least one results row before finalizing",
        ));
    }

    Ok(UpdatePlan {
        apply_fields: update.has_changes_besides_finalize(),
        mark_received,
        replace_results,
        finalize,
    })
}
