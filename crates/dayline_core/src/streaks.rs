use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::recurrence::{applies_on, first_occurrence_on_or_after, RecurrenceRule};

/// Derived streak counters for one habit, recomputed from its full
/// completion-date history whenever a completion is added or removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_completed_on: Option<NaiveDate>,
    pub next_occurrence_on: Option<NaiveDate>,
}

/// Recomputes streaks over the days the rule actually fires on. Days the habit
/// does not apply to neither extend nor break a streak; only a missed
/// applicable day resets the run.
pub fn recalculate(
    rule: &RecurrenceRule,
    completed: &BTreeSet<NaiveDate>,
    today: NaiveDate,
) -> StreakSummary {
    let mut best = 0u32;
    let mut run = 0u32;
    let mut current = 0u32;
    let mut last_applicable_completed: Option<NaiveDate> = None;

    if let Some(&earliest) = completed.iter().next() {
        let mut cursor = earliest;
        while cursor <= today {
            if applies_on(rule, cursor) {
                if completed.contains(&cursor) {
                    run += 1;
                    best = best.max(run);
                    last_applicable_completed = Some(cursor);
                } else {
                    run = 0;
                }
            }
            cursor += Duration::days(1);
        }

        if let Some(last) = last_applicable_completed {
            let mut cursor = last;
            while cursor >= earliest && applies_on(rule, cursor) {
                if !completed.contains(&cursor) {
                    break;
                }
                current += 1;
                cursor -= Duration::days(1);
                while cursor >= earliest && !applies_on(rule, cursor) {
                    cursor -= Duration::days(1);
                }
            }
        }
    }

    StreakSummary {
        current_streak: current,
        best_streak: best,
        last_completed_on: last_applicable_completed,
        next_occurrence_on: first_occurrence_on_or_after(rule, today),
    }
}
