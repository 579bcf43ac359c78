//! Day reconciliation: availability feed + slot derivation → day map.
//!
//! The availability feed names the days a resource operates; slot
//! derivation reveals days the feed never mentioned but whose schedule is
//! saturated. Both sources merge here so callers never lose a date either
//! one knows about.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{DayAvailability, DayEntry, DayStats};

/// Per-date derivation summary handed over by the snapshot builder.
#[derive(Debug, Clone, Copy)]
pub struct DayOutcome {
    pub all_booked: bool,
    pub stats: DayStats,
}

/// Merges the availability seed with per-date derivation outcomes.
///
/// - every seeded date starts as `available`;
/// - a saturated date missing from the seed is synthesized as `booked`;
/// - dates with counted non-gap slots get the open/full/partial mark,
///   receiving a bare `available` entry first if needed.
pub fn reconcile(
    seed_dates: &[NaiveDate],
    outcomes: &BTreeMap<NaiveDate, DayOutcome>,
) -> BTreeMap<NaiveDate, DayEntry> {
    let mut days: BTreeMap<NaiveDate, DayEntry> = BTreeMap::new();

    for date in seed_dates {
        days.insert(
            *date,
            DayEntry {
                status: DayAvailability::Available,
                mark: None,
            },
        );
    }

    for (date, outcome) in outcomes {
        if outcome.all_booked && !days.contains_key(date) {
            days.insert(
                *date,
                DayEntry {
                    status: DayAvailability::Booked,
                    mark: None,
                },
            );
        }

        if let Some(mark) = outcome.stats.mark() {
            let entry = days.entry(*date).or_insert(DayEntry {
                status: DayAvailability::Available,
                mark: None,
            });
            entry.mark = Some(mark);
        }
    }

    days
}
