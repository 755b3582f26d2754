use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// How far ahead `first_occurrence_on_or_after` will scan before giving up.
const MAX_SCAN_DAYS: i64 = 730;

/// Recurrence schedule for a habit. Weekdays are numbered Sunday = 0 through
/// Saturday = 6.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecurrenceRule {
    Daily,
    EveryNDays { interval: i64, anchor: NaiveDate },
    Weekdays(BTreeSet<u8>),
}

impl RecurrenceRule {
    /// Builds a weekday rule, discarding values outside 0..=6.
    pub fn weekdays(days: impl IntoIterator<Item = u8>) -> Self {
        Self::Weekdays(days.into_iter().filter(|d| *d <= 6).collect())
    }
}

/// Whether `rule` fires on `date`. Total over all inputs: malformed rules
/// (non-positive interval, empty weekday set) degrade to "never occurs"
/// instead of erroring.
pub fn applies_on(rule: &RecurrenceRule, date: NaiveDate) -> bool {
    match rule {
        RecurrenceRule::Daily => true,
        RecurrenceRule::EveryNDays { interval, anchor } => {
            if *interval <= 0 || date < *anchor {
                return false;
            }
            date.signed_duration_since(*anchor).num_days() % interval == 0
        }
        RecurrenceRule::Weekdays(days) => {
            if days.is_empty() {
                return false;
            }
            days.contains(&weekday_sun_first(date))
        }
    }
}

/// First date on or after `start` where the rule fires, scanning at most two
/// years ahead. `None` for rules that never occur.
pub fn first_occurrence_on_or_after(rule: &RecurrenceRule, start: NaiveDate) -> Option<NaiveDate> {
    for offset in 0..=MAX_SCAN_DAYS {
        let candidate = start + Duration::days(offset);
        if applies_on(rule, candidate) {
            return Some(candidate);
        }
    }
    None
}

fn weekday_sun_first(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
