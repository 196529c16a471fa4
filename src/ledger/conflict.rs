use crate::error::EngineError;
use crate::limits::MAX_BOOKINGS_PER_RESOURCE;
use crate::model::Interval;

use super::ResourceState;

pub(crate) fn validate_interval(interval: &Interval) -> Result<(), EngineError> {
    interval.validate()
}

/// Reject `interval` if any committed booking on `rs` overlaps it.
pub(crate) fn check_no_conflict(rs: &ResourceState, interval: &Interval) -> Result<(), EngineError> {
    if rs.bookings.len() >= MAX_BOOKINGS_PER_RESOURCE {
        return Err(EngineError::LimitExceeded("too many bookings on resource"));
    }
    if let Some((existing, _)) = rs.bookings.find_overlap(interval) {
        return Err(EngineError::Conflict {
            kind: rs.attrs.kind(),
            resource_id: rs.id.clone(),
            existing,
        });
    }
    Ok(())
}
