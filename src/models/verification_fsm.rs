//! Legal transitions of the verification lifecycle.
//!
//! `dispatch` is the sole way out of `NotDispatched` and may happen once;
//! `refresh` merges later remote updates into an already dispatched record.
//! Everything else is rejected before any remote call is made.

use crate::common_utils::get_current_timestamp_ms;
use crate::models::errors::VerifyError;
use crate::models::verification::{
    VerificationRecord, VerificationResult, VerificationState, VERIFIED_STATUS_TEXT,
};

/// Check that a dispatch is legal for this record.
pub fn ensure_dispatchable(record: &VerificationRecord) -> Result<(), VerifyError> {
    if record.verification_state.is_not_dispatched() {
        Ok(())
    } else {
        Err(VerifyError::DuplicateDispatch {
            id: record.order_id.to_string(),
        })
    }
}

/// Check that a status refresh is legal for this record.
pub fn ensure_refreshable(record: &VerificationRecord) -> Result<(), VerifyError> {
    if record.verification_state.is_not_dispatched() {
        return Err(VerifyError::NotDispatchedYet {
            remote_order_id: record.remote_order_id.clone(),
        });
    }
    if record.is_verified {
        return Err(VerifyError::AlreadyVerified {
            remote_order_id: record.remote_order_id.clone(),
        });
    }
    Ok(())
}

/// Apply a successful dispatch response.
///
/// Returns false when the response lacks a verification state, in which case
/// nothing is applied and the record stays in `NotDispatched`.
pub fn apply_dispatch(
    record: &mut VerificationRecord,
    result: &VerificationResult,
) -> Result<bool, VerifyError> {
    ensure_dispatchable(record)?;

    let state = match &result.verification_state {
        Some(state) => state.clone(),
        None => return Ok(false),
    };

    record.verification_state = VerificationState::Remote(state);
    record.verification_status = result.verification_status.clone();
    record.verification_strategy = result.verification_strategy.clone();
    Ok(true)
}

/// Merge a retrieve-status response into a dispatched record.
///
/// With an explicit verification state the state/status/strategy are updated.
/// With only a verified flag the record is marked verified with the fixed
/// status text and a verification date; the state is left unchanged.
/// Returns false when the response carries nothing to merge.
pub fn apply_status_refresh(
    record: &mut VerificationRecord,
    result: &VerificationResult,
) -> Result<bool, VerifyError> {
    ensure_refreshable(record)?;

    let mut updated = false;

    if result.is_verified.unwrap_or(false) {
        record.is_verified = true;
        if result.verification_state.is_none() {
            record.verification_status = Some(VERIFIED_STATUS_TEXT.to_string());
            record.verification_date =
                Some(result.verification_date.unwrap_or_else(get_current_timestamp_ms));
        } else if let Some(date) = result.verification_date {
            record.verification_date = Some(date);
        }
        updated = true;
    }

    if let Some(state) = &result.verification_state {
        record.verification_state = VerificationState::Remote(state.clone());
        record.verification_status = result.verification_status.clone();
        record.verification_strategy = result.verification_strategy.clone();
        updated = true;
    }

    Ok(updated)
}
