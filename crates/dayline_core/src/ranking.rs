use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Priority, TaskRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortMode {
    Smart,
    PriorityAsc,
    PriorityDesc,
    TimeAsc,
    TimeDesc,
    DeadlineAsc,
    DeadlineDesc,
}

pub fn priority_weight(priority: Priority) -> f64 {
    match priority {
        Priority::Low => 10.0,
        Priority::Medium => 25.0,
        Priority::High => 50.0,
    }
}

/// Coarse step function over hours until the deadline. Deliberately not
/// continuous: the product wants stable buckets, not a sliding gradient.
pub fn deadline_urgency(deadline: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = deadline.signed_duration_since(now).num_minutes() as f64 / 60.0;
    if hours <= 0.0 {
        100.0
    } else if hours <= 12.0 {
        60.0
    } else if hours <= 24.0 {
        35.0
    } else if hours <= 72.0 {
        15.0
    } else {
        0.0
    }
}

/// Tasks scheduled long ago and still open float upward, capped at 20.
pub fn staleness_bonus(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = now.signed_duration_since(scheduled_at).num_minutes() as f64 / 60.0;
    (hours / 3.0).clamp(0.0, 20.0)
}

/// Composite urgency score; higher is more urgent. Derived per render, never
/// persisted.
pub fn smart_score(task: &TaskRecord, now: DateTime<Utc>) -> f64 {
    priority_weight(task.priority)
        + deadline_urgency(task.deadline, now)
        + staleness_bonus(task.scheduled_at, now)
}

/// Sorts tasks in place. Every mode strictly partitions completed tasks after
/// incomplete ones; the mode only decides the order within each partition.
pub fn sort_tasks(tasks: &mut [TaskRecord], mode: SortMode, now: DateTime<Utc>) {
    tasks.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then_with(|| compare_in_mode(a, b, mode, now))
    });
}

fn compare_in_mode(a: &TaskRecord, b: &TaskRecord, mode: SortMode, now: DateTime<Utc>) -> Ordering {
    match mode {
        SortMode::Smart => smart_score(b, now)
            .partial_cmp(&smart_score(a, now))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.created_at.cmp(&b.created_at)),
        SortMode::PriorityAsc => a.priority.cmp(&b.priority),
        SortMode::PriorityDesc => b.priority.cmp(&a.priority),
        SortMode::TimeAsc => a.scheduled_at.cmp(&b.scheduled_at),
        SortMode::TimeDesc => b.scheduled_at.cmp(&a.scheduled_at),
        SortMode::DeadlineAsc => a.deadline.cmp(&b.deadline),
        SortMode::DeadlineDesc => b.deadline.cmp(&a.deadline),
    }
}
