//! Booking-subsystem feed adapter.
//!
//! The external booking subsystem exposes two feeds, both reached through
//! form-encoded POSTs to a single ajax endpoint:
//!
//! | Action | Feed |
//! |--------|------|
//! | `pbs_user_calendars_data` | day-availability records (`date_start` per row) |
//! | `dopbsp_calendar_schedule_get` | one calendar year of per-day hourly schedules |
//!
//! The schedule feed is doubly encoded: the response maps date strings to
//! JSON **strings**, each containing `{hours, hours_definitions}`. Field
//! values arrive loosely typed (numbers as numbers or numeric strings,
//! booleans as `true`/`"true"`/`1`), so every consumed field has a named
//! decode rule here instead of runtime shape sniffing.
//!
//! No retries: a failed call surfaces as [`UpstreamError`] so callers see
//! availability staleness instead of a masked one.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::UpstreamError;
use crate::models::SlotStatus;
use crate::timegrid::TimePoint;

/// One row of the day-availability feed. Only the date portion of
/// `date_start` is consumed.
#[derive(Debug, Clone)]
pub struct AvailabilityRecord {
    pub date_start: String,
}

/// One hour's entry in a day's schedule, decoded from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourEntry {
    pub status: SlotStatus,
    pub price: u64,
    pub available: i64,
    pub promo: bool,
}

/// A day's schedule payload after decoding: the hour grid plus the
/// per-start-time entries.
#[derive(Debug, Clone, Default)]
pub struct DaySchedule {
    pub defs: Vec<TimePoint>,
    pub hours: HashMap<TimePoint, HourEntry>,
}

/// Read-side interface to the booking subsystem. Implemented over HTTP
/// in production and by fixture feeds in tests.
#[async_trait]
pub trait BookingFeed: Send + Sync {
    /// Fetches the full day-availability feed for a calendar. The
    /// subsystem returns its entire known range; no date bounds exist.
    async fn day_availability(
        &self,
        calendar_id: u32,
    ) -> Result<Vec<AvailabilityRecord>, UpstreamError>;

    /// Fetches one calendar year of the hourly schedule feed, keyed by
    /// ISO date string. Values are the raw per-day JSON strings.
    async fn year_schedule(
        &self,
        calendar_id: u32,
        year: i32,
    ) -> Result<BTreeMap<String, String>, UpstreamError>;
}

/// Production [`BookingFeed`] over the subsystem's ajax endpoint.
pub struct HttpBookingFeed {
    client: reqwest::Client,
    ajax_url: String,
}

impl HttpBookingFeed {
    pub fn new(ajax_url: impl Into<String>, timeout_secs: u64) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            ajax_url: ajax_url.into(),
        })
    }
}

#[async_trait]
impl BookingFeed for HttpBookingFeed {
    async fn day_availability(
        &self,
        calendar_id: u32,
    ) -> Result<Vec<AvailabilityRecord>, UpstreamError> {
        let form = [
            ("action", "pbs_user_calendars_data".to_string()),
            ("calendar_id", calendar_id.to_string()),
        ];
        let body: Value = self
            .client
            .post(&self.ajax_url)
            .form(&form)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        let rows = body
            .get("availability")
            .ok_or_else(|| {
                UpstreamError::InvalidResponse("missing availability field".to_string())
            })?;
        Ok(parse_availability(rows))
    }

    async fn year_schedule(
        &self,
        calendar_id: u32,
        year: i32,
    ) -> Result<BTreeMap<String, String>, UpstreamError> {
        let form = [
            ("action", "dopbsp_calendar_schedule_get".to_string()),
            ("dopbsp_frontend_ajax_request", "true".to_string()),
            ("id", calendar_id.to_string()),
            ("year", year.to_string()),
            ("firstYear", "\"false\"".to_string()),
        ];
        let body: Value = self
            .client
            .post(&self.ajax_url)
            .form(&form)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        let obj = body.as_object().ok_or_else(|| {
            UpstreamError::InvalidResponse("schedule response is not an object".to_string())
        })?;

        let mut out = BTreeMap::new();
        for (date, raw) in obj {
            if let Some(s) = raw.as_str() {
                out.insert(date.clone(), s.to_string());
            }
        }
        Ok(out)
    }
}

/// Extracts `date_start` rows from the availability payload, which may be
/// a JSON array or an id-keyed object.
pub fn parse_availability(rows: &Value) -> Vec<AvailabilityRecord> {
    let values: Vec<&Value> = match rows {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };

    values
        .into_iter()
        .filter_map(|row| {
            let date_start = decode_string(row.get("date_start")?)?;
            if date_start.is_empty() {
                return None;
            }
            Some(AvailabilityRecord { date_start })
        })
        .collect()
}

/// Decodes one day's raw JSON string from the schedule feed.
///
/// Unparsable strings are an error; unknown time values inside an
/// otherwise valid payload are skipped row by row.
pub fn parse_day_schedule(raw: &str) -> Result<DaySchedule, UpstreamError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| UpstreamError::InvalidResponse(format!("day schedule: {e}")))?;

    let mut defs = Vec::new();
    if let Some(items) = value.get("hours_definitions").and_then(Value::as_array) {
        for item in items {
            let Some(text) = item.get("value").and_then(|v| decode_string(v)) else {
                continue;
            };
            if let Ok(point) = text.parse::<TimePoint>() {
                defs.push(point);
            }
        }
    }

    let mut hours = HashMap::new();
    if let Some(map) = value.get("hours").and_then(Value::as_object) {
        for (time, entry) in map {
            let Ok(point) = time.parse::<TimePoint>() else {
                continue;
            };
            hours.insert(point, decode_hour_entry(entry));
        }
    }

    Ok(DaySchedule { defs, hours })
}

/// Per-field decode of one hour entry. Missing fields take the zero
/// value; the status falls back to [`SlotStatus::Other`].
fn decode_hour_entry(entry: &Value) -> HourEntry {
    let status = entry
        .get("status")
        .and_then(decode_string_ref)
        .map(|s| match s.as_str() {
            "available" => SlotStatus::Available,
            "booked" => SlotStatus::Booked,
            "gap" => SlotStatus::Gap,
            _ => SlotStatus::Other,
        })
        .unwrap_or(SlotStatus::Other);

    HourEntry {
        status,
        price: entry.get("price").map_or(0, |v| decode_u64(v)),
        available: entry.get("available").map_or(0, |v| decode_i64(v)),
        promo: entry.get("promo").map_or(false, |v| decode_bool(v)),
    }
}

/// String field: accepts a JSON string, passes numbers through as text.
fn decode_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decode_string_ref(v: &Value) -> Option<String> {
    decode_string(v)
}

/// Unsigned integer field: a number, or a numeric string. Fractions and
/// negatives clamp to zero.
fn decode_u64(v: &Value) -> u64 {
    decode_i64(v).max(0) as u64
}

/// Signed integer field: a number, or a numeric string; anything else is
/// zero.
fn decode_i64(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .or_else(|_| s.trim().parse::<f64>().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Boolean field: JSON booleans, `"true"`/`"false"`, or the numeric
/// flags 1/0.
fn decode_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true" || s == "1",
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}
