//! Slot derivation: one day's hour grid + schedule payload → atomic slots.
//!
//! For a grid of N points the deriver walks the N-1 consecutive intervals.
//! Each interval either becomes a slot copied from the feed, a `gap` slot
//! (shorter than the calendar's minimum bookable block), or is skipped
//! entirely when the feed has no entry for its start time (a data gap is
//! not a booked guarantee).
//!
//! Alongside the slots, the deriver reports whether the whole day is
//! saturated and the non-gap counters used for the open/full/partial day
//! mark.

use chrono::NaiveDate;

use crate::models::{AtomicSlot, DayStats, SlotStatus};
use crate::timegrid::{smallest_unit_minutes, TimePoint};
use crate::upstream::{DaySchedule, HourEntry};

/// Fallback grid unit when no positive delta exists between grid points.
const DEFAULT_UNIT_MINUTES: u32 = 60;

/// Outcome of deriving one date.
#[derive(Debug, Clone)]
pub struct DayDerivation {
    pub slots: Vec<AtomicSlot>,
    /// True when every non-gap interval is booked or exhausted, and at
    /// least one such interval exists.
    pub all_booked: bool,
    pub stats: DayStats,
}

/// Derives the ordered slot list for `date`.
///
/// `minimum_lapse` is the rule's grid-units-per-booking; intervals
/// shorter than `unit * minimum_lapse` minutes collapse to `gap`
/// regardless of what the feed reported for them.
pub fn derive_day(date: NaiveDate, schedule: &DaySchedule, minimum_lapse: u32) -> DayDerivation {
    let defs = &schedule.defs;
    let mut out = DayDerivation {
        slots: Vec::new(),
        all_booked: true,
        stats: DayStats::default(),
    };

    if defs.len() < 2 {
        out.all_booked = false;
        return out;
    }

    let unit_minutes = smallest_unit_minutes(defs).unwrap_or(DEFAULT_UNIT_MINUTES);
    let block_minutes = match unit_minutes.checked_mul(minimum_lapse) {
        Some(b) if b > 0 => b,
        _ => unit_minutes,
    };

    for pair in defs.windows(2) {
        let (time_start, time_end) = (pair[0], pair[1]);
        let delta = time_start.minutes_until(time_end);
        if delta <= 0 {
            // irregular grid entry, nothing to emit for it
            continue;
        }
        let duration = delta as u32;

        let Some(entry) = schedule.hours.get(&time_start) else {
            out.all_booked = false;
            continue;
        };

        let slot = if duration < block_minutes {
            gap_slot(date, time_start, time_end, duration)
        } else {
            feed_slot(date, time_start, time_end, duration, entry)
        };

        if slot.status != SlotStatus::Gap {
            let filled = slot.status == SlotStatus::Booked || slot.available <= 0;
            if !filled {
                out.all_booked = false;
            }
            out.stats.record(filled);
        }

        out.slots.push(slot);
    }

    // a day with zero countable intervals is unknown, not saturated
    if out.stats.total == 0 {
        out.all_booked = false;
    }

    out
}

fn gap_slot(date: NaiveDate, time_start: TimePoint, time_end: TimePoint, duration: u32) -> AtomicSlot {
    AtomicSlot {
        date,
        time_start,
        time_end,
        status: SlotStatus::Gap,
        price: 0,
        available: 0,
        promo: false,
        duration,
    }
}

fn feed_slot(
    date: NaiveDate,
    time_start: TimePoint,
    time_end: TimePoint,
    duration: u32,
    entry: &HourEntry,
) -> AtomicSlot {
    AtomicSlot {
        date,
        time_start,
        time_end,
        status: entry.status,
        price: entry.price,
        available: entry.available,
        promo: entry.promo,
        duration,
    }
}
