//! Calendar snapshot construction.
//!
//! One snapshot = settings + rule + reconciled day map + derived slot
//! list for a calendar over a date range. Built from scratch per request:
//!
//! 1. resolve settings and the minimum-lapse rule from configuration;
//! 2. fetch the day-availability feed (fatal on failure — without it
//!    there is no date-range basis);
//! 3. fan out one schedule fetch per calendar year spanned by the range,
//!    concurrently; a failed year is skipped and recorded, never fatal;
//! 4. derive slots per date and reconcile the day map.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::config::Config;
use crate::days::{self, DayOutcome};
use crate::errors::UpstreamError;
use crate::models::CalendarSnapshot;
use crate::rules;
use crate::slots;
use crate::upstream::{parse_day_schedule, AvailabilityRecord, BookingFeed};

pub async fn build_snapshot(
    feed: Arc<dyn BookingFeed>,
    config: &Config,
    calendar_id: u32,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<CalendarSnapshot, UpstreamError> {
    let settings = rules::resolve_settings(&config.calendars, calendar_id);
    let rule = rules::resolve_rule(&config.rules, settings.rule_id);
    let lapse = rules::minimum_lapse(rule.as_ref());

    // Day-availability failure is fatal: it defines the observable range.
    let availability = feed.day_availability(calendar_id).await?;
    let observed = observed_dates(&availability);

    let (Some(&observed_min), Some(&observed_max)) = (observed.first(), observed.last()) else {
        return Ok(CalendarSnapshot {
            calendar_id,
            start,
            end,
            settings,
            rule,
            days: BTreeMap::new(),
            slots: Vec::new(),
            skipped_years: Vec::new(),
        });
    };

    let mut range_start = start.unwrap_or(observed_min);
    let mut range_end = end.unwrap_or(observed_max);
    if range_start > range_end {
        std::mem::swap(&mut range_start, &mut range_end);
    }

    let seed_dates: Vec<NaiveDate> = observed
        .into_iter()
        .filter(|d| *d >= range_start && *d <= range_end)
        .collect();

    // One schedule fetch per spanned year, issued concurrently. Arrival
    // order is irrelevant: results are unioned into a date-keyed map.
    let mut tasks = Vec::new();
    for year in range_start.year()..=range_end.year() {
        let feed = Arc::clone(&feed);
        tasks.push((
            year,
            tokio::spawn(async move { feed.year_schedule(calendar_id, year).await }),
        ));
    }

    let mut skipped_years = Vec::new();
    let mut outcomes: BTreeMap<NaiveDate, DayOutcome> = BTreeMap::new();
    let mut slots_by_date: BTreeMap<NaiveDate, Vec<crate::models::AtomicSlot>> = BTreeMap::new();

    for (year, task) in tasks {
        let schedule = match task.await {
            Ok(Ok(schedule)) => schedule,
            Ok(Err(err)) => {
                eprintln!("calendar {calendar_id}: skipping year {year}: {err}");
                skipped_years.push(year);
                continue;
            }
            Err(join_err) => {
                eprintln!("calendar {calendar_id}: skipping year {year}: {join_err}");
                skipped_years.push(year);
                continue;
            }
        };

        for (date_str, raw) in schedule {
            let Ok(date) = date_str.parse::<NaiveDate>() else {
                continue;
            };
            if date < range_start || date > range_end {
                continue;
            }
            let Ok(day_schedule) = parse_day_schedule(&raw) else {
                continue;
            };
            if day_schedule.defs.is_empty() {
                continue;
            }

            let derived = slots::derive_day(date, &day_schedule, lapse);
            outcomes.insert(
                date,
                DayOutcome {
                    all_booked: derived.all_booked,
                    stats: derived.stats,
                },
            );
            slots_by_date.insert(date, derived.slots);
        }
    }

    let days = days::reconcile(&seed_dates, &outcomes);
    let slots = slots_by_date.into_values().flatten().collect();

    Ok(CalendarSnapshot {
        calendar_id,
        start: Some(range_start),
        end: Some(range_end),
        settings,
        rule,
        days,
        slots,
        skipped_years,
    })
}

/// Sorted, deduplicated dates observed in the availability feed. Rows
/// whose date portion does not parse are ignored.
fn observed_dates(availability: &[AvailabilityRecord]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = availability
        .iter()
        .filter_map(|row| {
            let date_part = row.date_start.get(..10)?;
            date_part.parse().ok()
        })
        .collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CalendarConfig, RuleConfig};
    use crate::errors::UpstreamError;
    use crate::models::{DayAvailability, DayMark, SlotStatus};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    /// Fixture feed: canned availability rows and per-year schedules,
    /// with optional per-year failures.
    struct FixtureFeed {
        availability: Vec<String>,
        schedules: HashMap<i32, BTreeMap<String, String>>,
        failing_years: Vec<i32>,
        fail_availability: bool,
    }

    impl FixtureFeed {
        fn new() -> Self {
            Self {
                availability: Vec::new(),
                schedules: HashMap::new(),
                failing_years: Vec::new(),
                fail_availability: false,
            }
        }

        fn day(mut self, date: &str, hours: serde_json::Value, defs: &[&str]) -> Self {
            let year: i32 = date[..4].parse().unwrap();
            let defs: Vec<_> = defs.iter().map(|v| json!({ "value": v })).collect();
            let raw = json!({ "hours": hours, "hours_definitions": defs }).to_string();
            self.schedules.entry(year).or_default().insert(date.to_string(), raw);
            self
        }

        fn available(mut self, date: &str) -> Self {
            self.availability.push(format!("{date} 00:00:00"));
            self
        }
    }

    #[async_trait]
    impl BookingFeed for FixtureFeed {
        async fn day_availability(
            &self,
            _calendar_id: u32,
        ) -> Result<Vec<AvailabilityRecord>, UpstreamError> {
            if self.fail_availability {
                return Err(UpstreamError::InvalidResponse("down".into()));
            }
            Ok(self
                .availability
                .iter()
                .map(|d| AvailabilityRecord {
                    date_start: d.clone(),
                })
                .collect())
        }

        async fn year_schedule(
            &self,
            _calendar_id: u32,
            year: i32,
        ) -> Result<BTreeMap<String, String>, UpstreamError> {
            if self.failing_years.contains(&year) {
                return Err(UpstreamError::InvalidResponse("boom".into()));
            }
            Ok(self.schedules.get(&year).cloned().unwrap_or_default())
        }
    }

    fn config() -> Config {
        let mut cfg: Config = toml::from_str(
            r#"
[server]
bind = "127.0.0.1:0"

[upstream]
ajax_url = "http://unused.invalid"

[site]
base_url = "http://unused.invalid"
admin_email = "admin@example.com"

[enquiry]
secret = "s"
"#,
        )
        .unwrap();
        cfg.calendars = vec![CalendarConfig {
            id: 7,
            settings: [("rule".to_string(), "3".to_string())].into_iter().collect(),
        }];
        cfg.rules = vec![RuleConfig {
            id: 3,
            name: "hourly".into(),
            time_lapse_min: 1,
            time_lapse_max: 12,
        }];
        cfg
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_merges_feeds_and_marks_days() {
        let feed = FixtureFeed::new()
            .available("2026-03-01")
            .day(
                "2026-03-01",
                json!({
                    "10:00": { "status": "available", "price": 1000, "available": 3 },
                    "11:00": { "status": "booked", "price": 1000, "available": 0 },
                }),
                &["10:00", "11:00", "12:00"],
            )
            // fully booked day the availability feed never mentioned
            .day(
                "2026-03-02",
                json!({
                    "10:00": { "status": "booked", "price": 1000, "available": 0 },
                    "11:00": { "status": "booked", "price": 1000, "available": 0 },
                }),
                &["10:00", "11:00", "12:00"],
            );

        let snap = build_snapshot(Arc::new(feed), &config(), 7, None, None)
            .await
            .unwrap();

        assert_eq!(snap.start, Some(d("2026-03-01")));
        assert_eq!(snap.end, Some(d("2026-03-01")));
        // range clamps to the availability feed, so 03-02 is outside it
        assert_eq!(snap.days.len(), 1);
        assert_eq!(snap.days[&d("2026-03-01")].mark, Some(DayMark::Partial));
        assert_eq!(snap.slots.len(), 2);
    }

    #[tokio::test]
    async fn test_saturated_unlisted_day_surfaces_as_booked() {
        let feed = FixtureFeed::new()
            .available("2026-03-01")
            .available("2026-03-03")
            .day(
                "2026-03-02",
                json!({
                    "10:00": { "status": "booked", "price": 1000, "available": 0 },
                    "11:00": { "status": "booked", "price": 1000, "available": 0 },
                }),
                &["10:00", "11:00", "12:00"],
            );

        let snap = build_snapshot(Arc::new(feed), &config(), 7, None, None)
            .await
            .unwrap();

        assert_eq!(snap.days[&d("2026-03-02")].status, DayAvailability::Booked);
        assert_eq!(snap.days[&d("2026-03-02")].mark, Some(DayMark::Full));
        assert_eq!(snap.days[&d("2026-03-01")].status, DayAvailability::Available);
    }

    #[tokio::test]
    async fn test_availability_failure_is_fatal() {
        let mut feed = FixtureFeed::new();
        feed.fail_availability = true;
        let result = build_snapshot(Arc::new(feed), &config(), 7, None, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_failed_year_degrades_gracefully() {
        let mut feed = FixtureFeed::new()
            .available("2026-12-31")
            .available("2027-01-01")
            .day(
                "2026-12-31",
                json!({ "10:00": { "status": "available", "price": 500, "available": 1 } }),
                &["10:00", "11:00"],
            );
        feed.failing_years = vec![2027];

        let snap = build_snapshot(Arc::new(feed), &config(), 7, None, None)
            .await
            .unwrap();

        assert_eq!(snap.skipped_years, vec![2027]);
        assert_eq!(snap.slots.len(), 1);
        // the seeded day from the failed year is still present
        assert_eq!(snap.days[&d("2027-01-01")].status, DayAvailability::Available);
    }

    #[tokio::test]
    async fn test_requested_range_filters_and_swaps() {
        let feed = FixtureFeed::new()
            .available("2026-03-01")
            .available("2026-03-05")
            .day(
                "2026-03-05",
                json!({ "10:00": { "status": "available", "price": 500, "available": 1 } }),
                &["10:00", "11:00"],
            );

        // start/end given reversed: swapped, not rejected
        let snap = build_snapshot(
            Arc::new(feed),
            &config(),
            7,
            Some(d("2026-03-05")),
            Some(d("2026-03-02")),
        )
        .await
        .unwrap();

        assert_eq!(snap.start, Some(d("2026-03-02")));
        assert_eq!(snap.end, Some(d("2026-03-05")));
        assert!(!snap.days.contains_key(&d("2026-03-01")));
        assert_eq!(snap.slots[0].status, SlotStatus::Available);
    }

    #[tokio::test]
    async fn test_empty_availability_yields_empty_snapshot() {
        let feed = FixtureFeed::new();
        let snap = build_snapshot(Arc::new(feed), &config(), 7, None, None)
            .await
            .unwrap();
        assert!(snap.days.is_empty());
        assert!(snap.slots.is_empty());
        assert_eq!(snap.start, None);
    }
}
