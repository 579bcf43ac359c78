//! Core data models shared across the booking engine.
//!
//! These types carry the derived availability view: atomic slots, per-day
//! status entries, and the snapshot that bundles them for one calendar
//! and date range. Everything here is recomputed per request and never
//! persisted.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::timegrid::TimePoint;

/// Status of one atomic slot, as reported by the schedule feed or forced
/// by the gap-collapse rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Booked,
    /// Shorter than the calendar's minimum bookable block; never offered.
    Gap,
    /// Any other upstream status string (e.g. "special").
    #[serde(other)]
    Other,
}

/// One bookable (or blocked) interval between two consecutive grid points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicSlot {
    pub date: NaiveDate,
    pub time_start: TimePoint,
    pub time_end: TimePoint,
    pub status: SlotStatus,
    /// Price in currency minor units (currency-agnostic integer).
    pub price: u64,
    /// Remaining bookable count; the feed may report zero or negative.
    pub available: i64,
    pub promo: bool,
    /// Interval length in minutes; always positive.
    pub duration: u32,
}

impl AtomicSlot {
    /// Whether an end user could book this slot right now.
    pub fn is_bookable(&self) -> bool {
        self.status == SlotStatus::Available && self.available > 0
    }
}

/// Tri-state summary of how full a day's non-gap slots are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayMark {
    Open,
    Full,
    Partial,
}

/// Whether the resource operates at all on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayAvailability {
    Available,
    Booked,
}

/// Per-date entry in the reconciled day map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub status: DayAvailability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark: Option<DayMark>,
}

/// Non-gap slot counters for one date, used to classify the day mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayStats {
    pub total: u32,
    pub booked: u32,
    pub available: u32,
}

impl DayStats {
    pub fn record(&mut self, filled: bool) {
        self.total += 1;
        if filled {
            self.booked += 1;
        } else {
            self.available += 1;
        }
    }

    /// `full` when everything is filled, `open` when nothing is, else
    /// `partial`. Days with no counted slots get no mark at all.
    pub fn mark(&self) -> Option<DayMark> {
        if self.total == 0 {
            None
        } else if self.booked == self.total {
            Some(DayMark::Full)
        } else if self.booked == 0 {
            Some(DayMark::Open)
        } else {
            Some(DayMark::Partial)
        }
    }
}

/// Minimum/maximum booking duration rule attached to a calendar,
/// expressed in grid units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRule {
    pub id: u32,
    pub name: String,
    pub minimum_time_lapse: u32,
    pub maximum_time_lapse: u32,
}

impl CalendarRule {
    /// Grid units per legally bookable block; never below 1.
    pub fn minimum_lapse(&self) -> u32 {
        self.minimum_time_lapse.max(1)
    }
}

/// Typed view of a calendar's raw settings rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarSettings {
    pub calendar_id: u32,
    /// Default hour grid declared in settings (per-day feeds may override).
    pub hours_definitions: Vec<TimePoint>,
    pub rule_id: Option<u32>,
    pub show_hours: bool,
    pub show_prices: bool,
    /// Settings rows without a known decode rule, kept verbatim.
    pub extra: BTreeMap<String, String>,
}

/// The full derived view for one calendar over one date range.
///
/// Rebuilt from scratch on every request; `skipped_years` records
/// schedule-feed years that failed and contributed nothing.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarSnapshot {
    pub calendar_id: u32,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub settings: CalendarSettings,
    pub rule: Option<CalendarRule>,
    pub days: BTreeMap<NaiveDate, DayEntry>,
    pub slots: Vec<AtomicSlot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_years: Vec<i32>,
}
