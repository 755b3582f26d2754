use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};

use dayline_core::ids::SequentialGenerator;
use dayline_core::model::{EventKind, HabitRecord, Priority, ScheduleEntry};
use dayline_core::ranking::SortMode;
use dayline_core::recurrence::RecurrenceRule;
use dayline_core::store::MemoryStore;
use dayline_core::{NewTask, PlannerService};

const UNDO_WINDOW: Duration = Duration::from_millis(3000);

fn planner_with(store: Arc<MemoryStore>) -> PlannerService {
    PlannerService::builder()
        .with_store(Box::new(store))
        .with_id_generator(Box::new(SequentialGenerator::new("task")))
        .build()
        .expect("build planner service")
}

fn daily_habit(id: &str, time_minute: Option<u32>, duration: Option<u32>) -> HabitRecord {
    HabitRecord {
        id: id.to_string(),
        title: id.to_string(),
        rule: RecurrenceRule::Daily,
        time_minute,
        duration_minutes: duration,
        current_streak: 0,
        best_streak: 0,
        last_completed_on: None,
        next_occurrence_on: None,
        created_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
    }
}

fn new_task(title: &str, hour: u32, minute: u32, duration: Option<u32>) -> NewTask {
    let scheduled = Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap();
    NewTask {
        title: title.to_string(),
        description: String::new(),
        category_id: None,
        scheduled_at: scheduled,
        deadline: scheduled + ChronoDuration::hours(8),
        duration_minutes: duration,
        priority: Priority::Medium,
    }
}

fn fixture_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
}

#[test]
fn day_schedule_merges_tasks_and_habit_occurrences() {
    let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let store = Arc::new(MemoryStore::with_habits(vec![daily_habit(
        "stretch",
        Some(9 * 60),
        Some(30),
    )]));
    let service = planner_with(store);

    service
        .create_task(new_task("Write report", 9, 15, Some(60)), fixture_now())
        .unwrap();
    service
        .create_task(new_task("Standup", 10, 30, Some(15)), fixture_now())
        .unwrap();

    let schedule = service.day_schedule(date);
    assert_eq!(schedule.entries.len(), 3);

    // Habit 9:00-9:30 and task 9:15-10:15 overlap; the 10:30 task reuses row 0.
    assert_eq!(schedule.layout.row_count, 2);
    let habit_placed = schedule
        .layout
        .placed
        .iter()
        .find(|p| matches!(p.event.kind, EventKind::HabitOccurrence { .. }))
        .expect("habit occurrence placed");
    assert_eq!(habit_placed.row, 0);
    assert_eq!(habit_placed.event.start_minute, 540);
    assert_eq!(habit_placed.event.end_minute, 570);

    assert!(schedule
        .entries
        .iter()
        .any(|entry| matches!(entry, ScheduleEntry::Task(task) if task.title == "Write report")));

    // A day the habit fires on but no tasks fall on still shows the habit.
    let tomorrow = date + ChronoDuration::days(1);
    let schedule = service.day_schedule(tomorrow);
    assert_eq!(schedule.entries.len(), 1);
    assert!(matches!(
        schedule.entries[0],
        ScheduleEntry::HabitOccurrence(_, occurrence) if occurrence == tomorrow
    ));
}

#[test]
fn reload_range_replaces_the_task_cache_from_the_store() {
    use dayline_core::model::TaskRecord;
    use dayline_core::store::PlannerStore;

    let store = Arc::new(MemoryStore::new());
    let external = TaskRecord {
        id: "ext-1".to_string(),
        title: "Synced elsewhere".to_string(),
        description: String::new(),
        category_id: None,
        scheduled_at: fixture_now(),
        deadline: fixture_now() + ChronoDuration::hours(4),
        duration_minutes: Some(30),
        priority: Priority::Low,
        completed: false,
        completed_at: None,
        created_at: fixture_now(),
    };
    store.create_task(&external).unwrap();

    let service = planner_with(store);
    assert!(service.task("ext-1").is_none());

    let start = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    service.reload_range(start, start + ChronoDuration::days(1)).unwrap();
    assert_eq!(service.task("ext-1").unwrap().title, "Synced elsewhere");

    // A reload for a disjoint range evicts it again.
    let far = start + ChronoDuration::days(30);
    service.reload_range(far, far + ChronoDuration::days(1)).unwrap();
    assert!(service.task("ext-1").is_none());
}

#[test]
fn completing_a_task_commits_to_the_store_after_the_window() {
    let store = Arc::new(MemoryStore::new());
    let service = planner_with(store.clone());
    let task = service
        .create_task(new_task("Write report", 9, 0, Some(60)), fixture_now())
        .unwrap();

    let t0 = Instant::now();
    service.complete_task(&task.id, t0).unwrap();
    assert!(service.undo_is_open());
    assert!(service.task(&task.id).unwrap().completed);
    // Not yet persisted.
    assert!(!store.task(&task.id).unwrap().completed);

    service.poll(t0 + Duration::from_millis(100));
    assert!(!store.task(&task.id).unwrap().completed);

    service.poll(t0 + UNDO_WINDOW);
    assert!(!service.undo_is_open());
    assert!(store.task(&task.id).unwrap().completed);
    assert!(service.experience_progress().experience_points > 0);
}

#[test]
fn undo_within_the_window_restores_local_state() {
    let store = Arc::new(MemoryStore::new());
    let service = planner_with(store.clone());
    let task = service
        .create_task(new_task("Write report", 9, 0, None), fixture_now())
        .unwrap();

    let t0 = Instant::now();
    service.complete_task(&task.id, t0).unwrap();
    assert!(service.undo(t0 + Duration::from_millis(500)));

    let restored = service.task(&task.id).unwrap();
    assert!(!restored.completed);
    assert_eq!(restored.completed_at, None);
    assert!(!store.task(&task.id).unwrap().completed);
    // The commit deadline passing now does nothing.
    service.poll(t0 + UNDO_WINDOW * 2);
    assert!(!store.task(&task.id).unwrap().completed);
    assert_eq!(service.experience_progress().experience_points, 0);
}

#[test]
fn undo_after_the_deadline_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let service = planner_with(store.clone());
    let task = service
        .create_task(new_task("Write report", 9, 0, None), fixture_now())
        .unwrap();

    let t0 = Instant::now();
    service.complete_task(&task.id, t0).unwrap();
    assert!(!service.undo(t0 + UNDO_WINDOW));
    service.poll(t0 + UNDO_WINDOW);
    assert!(store.task(&task.id).unwrap().completed);
}

#[test]
fn a_new_action_force_commits_a_pending_delete() {
    let store = Arc::new(MemoryStore::new());
    let service = planner_with(store.clone());
    let doomed = service
        .create_task(new_task("Old draft", 9, 0, None), fixture_now())
        .unwrap();
    let other = service
        .create_task(new_task("Write report", 11, 0, None), fixture_now())
        .unwrap();

    let t0 = Instant::now();
    service.delete_task(&doomed.id, t0).unwrap();
    assert!(store.task(&doomed.id).is_some());

    // Completing another task inside the delete's window flushes the delete.
    service
        .complete_task(&other.id, t0 + Duration::from_millis(500))
        .unwrap();
    assert!(store.task(&doomed.id).is_none());
    // Undo now applies to the completion, not the vanished delete.
    assert!(service.undo(t0 + Duration::from_millis(600)));
    assert!(!service.task(&other.id).unwrap().completed);
    assert!(store.task(&doomed.id).is_none());
}

#[test]
fn habit_completion_commit_updates_streaks_and_awards_xp() {
    let today = Utc::now().date_naive();
    let store = Arc::new(MemoryStore::with_habits(vec![daily_habit(
        "stretch",
        Some(9 * 60),
        None,
    )]));
    let service = planner_with(store.clone());

    let t0 = Instant::now();
    service.complete_habit("stretch", today, t0).unwrap();
    assert!(service.undo_is_open());
    assert!(!store.completion_exists("stretch", today));

    service.poll(t0 + UNDO_WINDOW);
    assert!(store.completion_exists("stretch", today));

    let habit = service.habit("stretch").unwrap();
    assert_eq!(habit.current_streak, 1);
    assert_eq!(habit.best_streak, 1);
    assert_eq!(habit.last_completed_on, Some(today));
    assert!(service.experience_progress().experience_points > 0);
}

#[test]
fn habit_completion_rejects_dates_the_rule_skips() {
    let date = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(); // Tuesday
    let mut habit = daily_habit("gym", None, None);
    habit.rule = RecurrenceRule::weekdays([1, 3, 5]);
    let store = Arc::new(MemoryStore::with_habits(vec![habit]));
    let service = planner_with(store);

    assert!(service
        .complete_habit("gym", date, Instant::now())
        .is_err());
}

#[test]
fn commit_failures_surface_without_rolling_back() {
    let store = Arc::new(MemoryStore::new());
    let service = planner_with(store.clone());
    let task = service
        .create_task(new_task("Write report", 9, 0, None), fixture_now())
        .unwrap();

    let t0 = Instant::now();
    service.complete_task(&task.id, t0).unwrap();
    store.set_fail_writes(true);
    service.poll(t0 + UNDO_WINDOW);

    // The failure is reported, the optimistic completion stays visible, and
    // the store never saw the change.
    assert!(service.last_error().is_some());
    assert!(service.task(&task.id).unwrap().completed);
    assert!(!store.task(&task.id).unwrap().completed);
    assert_eq!(service.experience_progress().experience_points, 0);
}

#[test]
fn flush_commits_a_pending_delete_on_teardown() {
    let store = Arc::new(MemoryStore::new());
    let service = planner_with(store.clone());
    let task = service
        .create_task(new_task("Write report", 9, 0, None), fixture_now())
        .unwrap();

    service.delete_task(&task.id, Instant::now()).unwrap();
    service.flush();
    assert!(store.task(&task.id).is_none());
    // Idempotent.
    service.flush();
    assert!(!service.undo_is_open());
}

#[test]
fn ranked_tasks_respect_mode_and_completion_partition() {
    let store = Arc::new(MemoryStore::new());
    let service = planner_with(store.clone());
    let urgent = service
        .create_task(
            NewTask {
                priority: Priority::Low,
                deadline: fixture_now() - ChronoDuration::hours(1),
                ..new_task("Overdue errand", 7, 0, None)
            },
            fixture_now(),
        )
        .unwrap();
    let relaxed = service
        .create_task(
            NewTask {
                priority: Priority::High,
                deadline: fixture_now() + ChronoDuration::hours(100),
                ..new_task("Someday project", 8, 0, None)
            },
            fixture_now(),
        )
        .unwrap();

    let ranked = service.ranked_tasks(SortMode::Smart, fixture_now());
    assert_eq!(ranked[0].id, urgent.id);
    assert_eq!(ranked[1].id, relaxed.id);

    // Completing the urgent task moves it behind the open one in every mode.
    let t0 = Instant::now();
    service.complete_task(&urgent.id, t0).unwrap();
    service.poll(t0 + UNDO_WINDOW);
    for mode in [SortMode::Smart, SortMode::DeadlineAsc, SortMode::PriorityDesc] {
        let ranked = service.ranked_tasks(mode, fixture_now());
        assert_eq!(ranked[0].id, relaxed.id, "mode {mode:?}");
        assert_eq!(ranked[1].id, urgent.id);
    }
}
