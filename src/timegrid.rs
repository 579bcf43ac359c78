//! Time-of-day grid primitives.
//!
//! Booking calendars describe a day as an ordered list of `"HH:MM"`
//! boundary points (e.g. `10:00, 11:00, …, 24:00`). Slots are the
//! half-open intervals between consecutive points. This module owns the
//! parsing, formatting, ordering, and minute arithmetic for those points.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A time-of-day grid point, stored as minutes since midnight.
///
/// `24:00` is a legal value (1440 minutes) — calendars use it as the
/// closing boundary of the last slot of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint(u16);

impl TimePoint {
    pub const MAX_MINUTES: u16 = 24 * 60;

    /// Builds a point from hours and minutes. Returns `None` when the
    /// result would pass `24:00` or the minutes are out of range.
    pub fn new(hours: u16, minutes: u16) -> Option<Self> {
        if minutes >= 60 {
            return None;
        }
        // widen before multiplying: hour values come from untrusted input
        let total = u32::from(hours) * 60 + u32::from(minutes);
        if total > u32::from(Self::MAX_MINUTES) {
            return None;
        }
        Some(TimePoint(total as u16))
    }

    /// Builds a point directly from minutes since midnight.
    pub fn from_minutes(total: u16) -> Option<Self> {
        (total <= Self::MAX_MINUTES).then_some(TimePoint(total))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    /// Signed minute delta `other - self`.
    pub fn minutes_until(&self, other: TimePoint) -> i32 {
        i32::from(other.0) - i32::from(self.0)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimePoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid time point: {:?}", s))?;
        let hours: u16 = h
            .parse()
            .map_err(|_| format!("invalid hours in time point: {:?}", s))?;
        let minutes: u16 = m
            .parse()
            .map_err(|_| format!("invalid minutes in time point: {:?}", s))?;
        TimePoint::new(hours, minutes).ok_or_else(|| format!("time point out of range: {:?}", s))
    }
}

impl Serialize for TimePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimePoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Smallest positive minute delta between consecutive grid points.
///
/// Guards against irregular grids (duplicate or out-of-order points
/// contribute no positive delta). Returns `None` when no positive delta
/// exists, in which case callers fall back to 60 minutes.
pub fn smallest_unit_minutes(points: &[TimePoint]) -> Option<u32> {
    let mut unit: Option<u32> = None;
    for pair in points.windows(2) {
        let delta = pair[0].minutes_until(pair[1]);
        if delta <= 0 {
            continue;
        }
        let delta = delta as u32;
        if unit.map_or(true, |u| delta < u) {
            unit = Some(delta);
        }
    }
    unit
}
