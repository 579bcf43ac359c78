//! Schedule rule and calendar settings resolution.
//!
//! Calendar settings arrive as raw name/value string rows. Each consumed
//! field has a named decode rule (integer, boolean, JSON array); rows
//! without one are passed through verbatim in `extra`. Optional display
//! flags default to visible when the row is absent.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::{CalendarConfig, RuleConfig};
use crate::models::{CalendarRule, CalendarSettings};
use crate::timegrid::TimePoint;

#[derive(Debug, Deserialize)]
struct HourDefRow {
    value: String,
}

/// Decodes a calendar's raw settings rows into the typed view.
///
/// A calendar unknown to configuration resolves to empty defaults rather
/// than an error: the schedule feed still carries per-day grids.
pub fn resolve_settings(calendars: &[CalendarConfig], calendar_id: u32) -> CalendarSettings {
    let mut settings = CalendarSettings {
        calendar_id,
        show_hours: true,
        show_prices: true,
        ..CalendarSettings::default()
    };

    let Some(calendar) = calendars.iter().find(|c| c.id == calendar_id) else {
        return settings;
    };

    let mut extra = BTreeMap::new();
    for (name, value) in &calendar.settings {
        match name.as_str() {
            "rule" => settings.rule_id = decode_u32(value),
            "hours_definitions" => settings.hours_definitions = decode_hour_defs(value),
            "show_hours" => settings.show_hours = decode_flag(value, true),
            "show_prices" => settings.show_prices = decode_flag(value, true),
            _ => {
                extra.insert(name.clone(), value.clone());
            }
        }
    }
    settings.extra = extra;
    settings
}

/// Looks up the rule a calendar's settings point at.
pub fn resolve_rule(rules: &[RuleConfig], rule_id: Option<u32>) -> Option<CalendarRule> {
    let rule_id = rule_id?;
    rules.iter().find(|r| r.id == rule_id).map(|r| CalendarRule {
        id: r.id,
        name: r.name.clone(),
        minimum_time_lapse: r.time_lapse_min,
        maximum_time_lapse: r.time_lapse_max,
    })
}

/// Grid units per bookable block; 1 when no rule resolves.
pub fn minimum_lapse(rule: Option<&CalendarRule>) -> u32 {
    rule.map(CalendarRule::minimum_lapse).unwrap_or(1)
}

fn decode_u32(value: &str) -> Option<u32> {
    value.trim().parse().ok().filter(|v| *v > 0)
}

/// Display flags: "0", "false" and "" mean off; anything else (including
/// absence, handled by the caller's default) means on.
fn decode_flag(value: &str, default_when_blank: bool) -> bool {
    match value.trim() {
        "" => default_when_blank,
        "0" | "false" => false,
        _ => true,
    }
}

/// JSON array of `{"value": "HH:MM"}` rows; unparsable entries are
/// dropped, unparsable JSON yields an empty grid.
fn decode_hour_defs(value: &str) -> Vec<TimePoint> {
    let rows: Vec<HourDefRow> = match serde_json::from_str(value) {
        Ok(rows) => rows,
        Err(_) => return Vec::new(),
    };
    rows.into_iter()
        .filter_map(|row| row.value.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar(id: u32, settings: &[(&str, &str)]) -> CalendarConfig {
        CalendarConfig {
            id,
            settings: settings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_settings_decode_known_fields() {
        let cals = vec![calendar(
            7,
            &[
                ("rule", "3"),
                (
                    "hours_definitions",
                    r#"[{"value":"10:00"},{"value":"11:00"},{"value":"oops"}]"#,
                ),
                ("show_prices", "false"),
                ("theme", "dark"),
            ],
        )];
        let s = resolve_settings(&cals, 7);
        assert_eq!(s.rule_id, Some(3));
        assert_eq!(s.hours_definitions.len(), 2);
        assert!(s.show_hours);
        assert!(!s.show_prices);
        assert_eq!(s.extra.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn test_unknown_calendar_gets_defaults() {
        let s = resolve_settings(&[], 99);
        assert_eq!(s.calendar_id, 99);
        assert_eq!(s.rule_id, None);
        assert!(s.show_hours);
        assert!(s.show_prices);
        assert!(s.hours_definitions.is_empty());
    }

    #[test]
    fn test_rule_resolution_and_lapse_default() {
        let rules = vec![RuleConfig {
            id: 3,
            name: "two-hour blocks".into(),
            time_lapse_min: 2,
            time_lapse_max: 8,
        }];
        let rule = resolve_rule(&rules, Some(3)).unwrap();
        assert_eq!(minimum_lapse(Some(&rule)), 2);

        assert!(resolve_rule(&rules, Some(4)).is_none());
        assert!(resolve_rule(&rules, None).is_none());
        assert_eq!(minimum_lapse(None), 1);
    }

    #[test]
    fn test_flag_decode_rules() {
        assert!(decode_flag("", true));
        assert!(!decode_flag("0", true));
        assert!(!decode_flag("false", true));
        assert!(decode_flag("1", false));
        assert!(decode_flag("true", false));
    }
}
