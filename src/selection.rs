//! Contiguous slot-range selection.
//!
//! Given the flattened slot list of a snapshot, walk from a start time
//! along the `time_end == next.time_start` chain until the requested end
//! time is reached exactly. The walk is bounded so a cyclic or degenerate
//! chain can never loop.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::errors::BookingError;
use crate::models::AtomicSlot;
use crate::timegrid::TimePoint;

/// Upper bound on chain length: one day has at most 48 half-hour steps.
const MAX_CHAIN_LEN: usize = 48;

/// Selects the contiguous slot chain covering `[start, end)` on `date`.
///
/// The chain must be exact: it starts at `start`, each link begins where
/// the previous one ended, and the final link ends at `end` precisely. A
/// chain that overshoots `end` is not contiguous.
pub fn select_range(
    slots: &[AtomicSlot],
    date: NaiveDate,
    start: TimePoint,
    end: TimePoint,
) -> Result<Vec<AtomicSlot>, BookingError> {
    let by_start: HashMap<TimePoint, &AtomicSlot> = slots
        .iter()
        .filter(|s| s.date == date)
        .map(|s| (s.time_start, s))
        .collect();

    let mut chain = Vec::new();
    let mut cursor = start;

    while cursor < end {
        if chain.len() >= MAX_CHAIN_LEN {
            return Err(BookingError::RangeNotContiguous);
        }
        let slot = by_start
            .get(&cursor)
            .ok_or(BookingError::SlotMissing { date, time: cursor })?;
        if slot.time_end <= slot.time_start {
            return Err(BookingError::SlotInvalid { date, time: cursor });
        }
        chain.push((*slot).clone());
        cursor = slot.time_end;
    }

    if chain.is_empty() {
        return Err(BookingError::InvalidRange);
    }
    if cursor != end {
        return Err(BookingError::RangeNotContiguous);
    }
    Ok(chain)
}
