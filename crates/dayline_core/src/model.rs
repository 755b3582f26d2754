use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::RecurrenceRule;

pub const MINUTES_PER_DAY: u32 = 1440;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Maps the 1..=3 integer level used by the backing store. Out-of-range
    /// values clamp rather than fail.
    pub fn from_level(level: i32) -> Self {
        match level {
            i32::MIN..=1 => Priority::Low,
            2 => Priority::Medium,
            _ => Priority::High,
        }
    }

    pub fn level(self) -> i32 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub duration_minutes: Option<u32>,
    pub priority: Priority,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitRecord {
    pub id: String,
    pub title: String,
    pub rule: RecurrenceRule,
    pub time_minute: Option<u32>,
    pub duration_minutes: Option<u32>,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_completed_on: Option<NaiveDate>,
    pub next_occurrence_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// One row of a day's unified schedule: either a dated task or a single
/// calendar-date occurrence of a recurring habit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScheduleEntry {
    Task(TaskRecord),
    HabitOccurrence(HabitRecord, NaiveDate),
}

impl ScheduleEntry {
    pub fn title(&self) -> &str {
        match self {
            ScheduleEntry::Task(task) => &task.title,
            ScheduleEntry::HabitOccurrence(habit, _) => &habit.title,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    Task { task_id: String },
    HabitOccurrence { habit_id: String, date: NaiveDate },
}

/// A time-bounded entry on a single day's timeline. `end_minute` is always
/// strictly greater than `start_minute` and at most `MINUTES_PER_DAY`; the
/// adapters below enforce the minimum-duration floor before layout runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub start_minute: u32,
    pub end_minute: u32,
    pub completed: bool,
    pub kind: EventKind,
}

/// Widens a task into a timeline event for the day it is scheduled on.
pub fn event_for_task(task: &TaskRecord, min_duration: u32) -> Event {
    let start = task.scheduled_at.hour() * 60 + task.scheduled_at.minute();
    let (start, end) = normalized_span(start, task.duration_minutes, min_duration);
    Event {
        id: task.id.clone(),
        title: task.title.clone(),
        start_minute: start,
        end_minute: end,
        completed: task.completed,
        kind: EventKind::Task {
            task_id: task.id.clone(),
        },
    }
}

/// Widens a habit occurrence into a timeline event. Habits without a time of
/// day default to the top of the timeline.
pub fn event_for_habit(
    habit: &HabitRecord,
    date: NaiveDate,
    completed: bool,
    min_duration: u32,
) -> Event {
    let start = habit.time_minute.unwrap_or(0);
    let (start, end) = normalized_span(start, habit.duration_minutes, min_duration);
    Event {
        id: format!("{}@{}", habit.id, date),
        title: habit.title.clone(),
        start_minute: start,
        end_minute: end,
        completed,
        kind: EventKind::HabitOccurrence {
            habit_id: habit.id.clone(),
            date,
        },
    }
}

/// Clamps a raw `(start, duration)` pair into the day, applying the minimum
/// duration floor and keeping `end > start` even at the day boundary.
fn normalized_span(start: u32, duration: Option<u32>, min_duration: u32) -> (u32, u32) {
    let min_duration = min_duration.max(1);
    let start = start.min(MINUTES_PER_DAY - 1);
    let duration = duration.unwrap_or(min_duration).max(min_duration);
    let end = start.saturating_add(duration).min(MINUTES_PER_DAY);
    (start, end.max(start + 1))
}
