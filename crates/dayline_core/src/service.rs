use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    ids::{IdGenerator, UuidGenerator},
    layout::{self, DayLayout},
    model::{
        event_for_habit, event_for_task, Event, HabitRecord, Priority, ScheduleEntry, TaskRecord,
    },
    progression::{
        self, habit_completion_xp, task_completion_xp, HabitCompletion, LevelProgress,
        TaskCompletion,
    },
    ranking::{self, SortMode},
    recurrence,
    store::{MemoryStore, PlannerStore},
    streaks,
    undo::{MutationCoordinator, UndoableAction},
};

/// A day's unified schedule: the merged task/habit entries plus their packed
/// timeline layout. Recomputed per render; never cached across input changes.
#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub entries: Vec<ScheduleEntry>,
    pub events: Vec<Event>,
    pub layout: DayLayout,
}

/// Input for task creation; the service mints the id and creation timestamp.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub duration_minutes: Option<u32>,
    pub priority: Priority,
}

pub struct PlannerService {
    store: Box<dyn PlannerStore>,
    ids: Box<dyn IdGenerator>,
    config: EngineConfig,
    tasks: RwLock<HashMap<String, TaskRecord>>,
    habits: RwLock<HashMap<String, HabitRecord>>,
    completions: RwLock<HashMap<String, BTreeSet<NaiveDate>>>,
    coordinator: Mutex<MutationCoordinator>,
    experience: RwLock<u64>,
    last_error: RwLock<Option<String>>,
}

pub struct PlannerServiceBuilder {
    store: Option<Box<dyn PlannerStore>>,
    ids: Option<Box<dyn IdGenerator>>,
    config: EngineConfig,
}

impl PlannerServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            ids: None,
            config: EngineConfig::default(),
        }
    }

    pub fn with_store(mut self, store: Box<dyn PlannerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<PlannerService> {
        let config = self.config;
        let coordinator = MutationCoordinator::new(config.undo_window, config.undo_tick);
        let service = PlannerService {
            store: self.store.unwrap_or_else(|| Box::new(MemoryStore::new())),
            ids: self.ids.unwrap_or_else(|| Box::new(UuidGenerator)),
            config,
            tasks: RwLock::new(HashMap::new()),
            habits: RwLock::new(HashMap::new()),
            completions: RwLock::new(HashMap::new()),
            coordinator: Mutex::new(coordinator),
            experience: RwLock::new(0),
            last_error: RwLock::new(None),
        };
        service.reload_habits()?;
        Ok(service)
    }
}

impl Default for PlannerServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerService {
    pub fn builder() -> PlannerServiceBuilder {
        PlannerServiceBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replaces the task cache with the store's records for `[start, end)`.
    /// Call before rendering a range the cache has not seen yet.
    pub fn reload_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
        let records = self
            .store
            .list_tasks_for_range(start, end)
            .map_err(|err| anyhow!(err))?;
        let count = records.len();
        let mut tasks = self.tasks.write();
        tasks.clear();
        for record in records {
            tasks.insert(record.id.clone(), record);
        }
        info!(task_count = count, "task range reloaded");
        Ok(())
    }

    /// Refreshes habit records and their completion histories from the store.
    pub fn reload_habits(&self) -> Result<()> {
        let records = self.store.list_habits().map_err(|err| anyhow!(err))?;
        let mut completions = HashMap::new();
        for habit in &records {
            let dates = self
                .store
                .habit_completions(&habit.id)
                .map_err(|err| anyhow!(err))?;
            completions.insert(habit.id.clone(), dates.into_iter().collect::<BTreeSet<_>>());
        }
        let count = records.len();
        *self.habits.write() = records
            .into_iter()
            .map(|habit| (habit.id.clone(), habit))
            .collect();
        *self.completions.write() = completions;
        info!(habit_count = count, "habits reloaded");
        Ok(())
    }

    /// Builds the unified schedule for one day: tasks scheduled on it, plus
    /// every habit whose recurrence rule fires on it, packed into timeline
    /// rows.
    pub fn day_schedule(&self, date: NaiveDate) -> DaySchedule {
        let min_duration = self.config.min_event_minutes;
        let mut rows: Vec<(Event, ScheduleEntry)> = Vec::new();

        for task in self.tasks.read().values() {
            if task.scheduled_at.date_naive() == date {
                rows.push((
                    event_for_task(task, min_duration),
                    ScheduleEntry::Task(task.clone()),
                ));
            }
        }

        let completions = self.completions.read();
        for habit in self.habits.read().values() {
            if recurrence::applies_on(&habit.rule, date) {
                let completed = completions
                    .get(&habit.id)
                    .is_some_and(|dates| dates.contains(&date));
                rows.push((
                    event_for_habit(habit, date, completed, min_duration),
                    ScheduleEntry::HabitOccurrence(habit.clone(), date),
                ));
            }
        }
        drop(completions);

        rows.sort_by(|a, b| {
            a.0.start_minute
                .cmp(&b.0.start_minute)
                .then_with(|| a.0.title.cmp(&b.0.title))
        });
        let (events, entries): (Vec<Event>, Vec<ScheduleEntry>) = rows.into_iter().unzip();
        let layout = layout::layout(&events);
        debug!(
            %date,
            event_count = events.len(),
            row_count = layout.row_count,
            "day schedule built"
        );

        DaySchedule {
            date,
            entries,
            events,
            layout,
        }
    }

    /// Cached tasks ordered for a list view. Completed tasks always trail
    /// incomplete ones, whatever the mode.
    pub fn ranked_tasks(&self, mode: SortMode, now: DateTime<Utc>) -> Vec<TaskRecord> {
        let mut tasks: Vec<TaskRecord> = self.tasks.read().values().cloned().collect();
        ranking::sort_tasks(&mut tasks, mode, now);
        tasks
    }

    pub fn task(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.read().get(task_id).cloned()
    }

    pub fn habit(&self, habit_id: &str) -> Option<HabitRecord> {
        self.habits.read().get(habit_id).cloned()
    }

    /// Creates a task with a generated id and writes it through immediately.
    /// Creation is not undoable; only completion and deletion get a window.
    pub fn create_task(&self, new_task: NewTask, now: DateTime<Utc>) -> Result<TaskRecord> {
        let record = TaskRecord {
            id: self.ids.next_id(),
            title: new_task.title.trim().to_string(),
            description: new_task.description.trim().to_string(),
            category_id: new_task.category_id,
            scheduled_at: new_task.scheduled_at,
            deadline: new_task.deadline,
            duration_minutes: new_task.duration_minutes,
            priority: new_task.priority,
            completed: false,
            completed_at: None,
            created_at: now,
        };
        self.store
            .create_task(&record)
            .map_err(|err| anyhow!(err))?;
        self.tasks.write().insert(record.id.clone(), record.clone());
        info!(task_id = %record.id, "task created");
        Ok(record)
    }

    /// Marks a task complete in local state and opens the undo window.
    pub fn complete_task(&self, task_id: &str, now: Instant) -> Result<()> {
        let snapshot = self
            .task(task_id)
            .ok_or_else(|| anyhow!("unknown task {task_id}"))?;
        if snapshot.completed {
            debug!(task_id, "task already completed");
            return Ok(());
        }

        {
            let mut tasks = self.tasks.write();
            if let Some(task) = tasks.get_mut(task_id) {
                task.completed = true;
                task.completed_at = Some(Utc::now());
            }
        }
        info!(task_id, "task completed optimistically");
        self.open_window(UndoableAction::CompleteTask { snapshot }, now);
        Ok(())
    }

    /// Records a habit occurrence as done for `date` and opens the undo
    /// window. Rejects dates the habit's rule does not fire on.
    pub fn complete_habit(&self, habit_id: &str, date: NaiveDate, now: Instant) -> Result<()> {
        let habit = self
            .habit(habit_id)
            .ok_or_else(|| anyhow!("unknown habit {habit_id}"))?;
        if !recurrence::applies_on(&habit.rule, date) {
            return Err(anyhow!("habit {habit_id} does not apply on {date}"));
        }

        self.completions
            .write()
            .entry(habit.id.clone())
            .or_default()
            .insert(date);
        info!(habit_id, %date, "habit occurrence completed optimistically");
        self.open_window(
            UndoableAction::CompleteHabit {
                habit_id: habit.id,
                date,
            },
            now,
        );
        Ok(())
    }

    /// Removes a task from local state and opens the undo window. The store
    /// delete only happens at commit time.
    pub fn delete_task(&self, task_id: &str, now: Instant) -> Result<()> {
        let snapshot = self
            .tasks
            .write()
            .remove(task_id)
            .ok_or_else(|| anyhow!("unknown task {task_id}"))?;
        info!(task_id, "task deleted optimistically");
        self.open_window(UndoableAction::DeleteTask { snapshot }, now);
        Ok(())
    }

    /// Cancels the open undo window, restoring the pre-change state. Returns
    /// false when there is nothing left to undo (already committed, already
    /// undone, or never opened).
    pub fn undo(&self, now: Instant) -> bool {
        let Some(action) = self.coordinator.lock().undo(now) else {
            return false;
        };
        match action {
            UndoableAction::CompleteTask { snapshot } | UndoableAction::DeleteTask { snapshot } => {
                info!(task_id = %snapshot.id, "task mutation reverted");
                self.tasks.write().insert(snapshot.id.clone(), snapshot);
            }
            UndoableAction::CompleteHabit { habit_id, date } => {
                info!(habit_id = %habit_id, %date, "habit completion reverted");
                if let Some(dates) = self.completions.write().get_mut(&habit_id) {
                    dates.remove(&date);
                }
            }
        }
        true
    }

    /// Drives the undo countdown. Call on the UI tick; when the window's
    /// deadline has elapsed the action's real side effect runs here.
    pub fn poll(&self, now: Instant) {
        let committed = self.coordinator.lock().poll(now);
        if let Some(action) = committed {
            self.commit(action);
        }
    }

    /// Teardown path: immediately commits whatever is still pending so a
    /// deletion cannot vanish with the screen. Idempotent.
    pub fn flush(&self) {
        let pending = self.coordinator.lock().flush();
        if let Some(action) = pending {
            self.commit(action);
        }
    }

    pub fn undo_is_open(&self) -> bool {
        self.coordinator.lock().is_open()
    }

    pub fn undo_message(&self) -> Option<String> {
        self.coordinator.lock().message()
    }

    pub fn undo_progress(&self, now: Instant) -> Option<f32> {
        self.coordinator.lock().progress(now)
    }

    /// Most recent commit-phase store failure, for surfacing in the UI. The
    /// optimistic state that triggered it is deliberately left in place.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub fn experience_progress(&self) -> LevelProgress {
        progression::progress_from_experience(*self.experience.read())
    }

    fn open_window(&self, action: UndoableAction, now: Instant) {
        let forced = self.coordinator.lock().begin(action, now);
        if let Some(prior) = forced {
            debug!(message = %prior.message(), "pending delete force-committed");
            self.commit(prior);
        }
    }

    fn commit(&self, action: UndoableAction) {
        match action {
            UndoableAction::CompleteTask { snapshot } => self.commit_task_completion(snapshot),
            UndoableAction::CompleteHabit { habit_id, date } => {
                self.commit_habit_completion(&habit_id, date)
            }
            UndoableAction::DeleteTask { snapshot } => {
                if let Err(err) = self.store.delete_task(&snapshot.id) {
                    self.surface_commit_error("delete task", &err.to_string());
                } else {
                    info!(task_id = %snapshot.id, "task deletion committed");
                }
            }
        }
    }

    fn commit_task_completion(&self, snapshot: TaskRecord) {
        // The cache holds the optimistic record; fall back to marking the
        // snapshot if it was evicted by a reload in the meantime.
        let record = self.task(&snapshot.id).unwrap_or_else(|| {
            let mut record = snapshot.clone();
            record.completed = true;
            record
        });
        if let Err(err) = self.store.update_task(&record) {
            self.surface_commit_error("complete task", &err.to_string());
            return;
        }
        let on_time = record
            .completed_at
            .map(|at| at <= record.deadline)
            .unwrap_or(false);
        let xp = task_completion_xp(&TaskCompletion {
            priority_level: record.priority.level(),
            planned_minutes: record.duration_minutes,
            actual_minutes: None,
            completed_on_time: on_time,
            completion_streak: 0,
        });
        self.award_xp(xp);
        info!(task_id = %record.id, xp, "task completion committed");
    }

    fn commit_habit_completion(&self, habit_id: &str, date: NaiveDate) {
        if let Err(err) = self
            .store
            .set_habit_occurrence_completed(habit_id, date, true)
        {
            self.surface_commit_error("complete habit", &err.to_string());
            return;
        }

        let Some(mut habit) = self.habit(habit_id) else {
            return;
        };
        let today = Utc::now().date_naive();
        let summary = {
            let completions = self.completions.read();
            let empty = BTreeSet::new();
            let dates = completions.get(habit_id).unwrap_or(&empty);
            streaks::recalculate(&habit.rule, dates, today)
        };
        habit.current_streak = summary.current_streak;
        habit.best_streak = summary.best_streak;
        habit.last_completed_on = summary.last_completed_on;
        habit.next_occurrence_on = summary.next_occurrence_on;
        if let Err(err) = self.store.update_habit(&habit) {
            warn!(habit_id, %err, "streak update not persisted");
        }

        let xp = habit_completion_xp(&HabitCompletion {
            planned_minutes: habit.duration_minutes,
            actual_minutes: None,
            completed_on_time: date == today,
            habit_streak: habit.current_streak,
        });
        self.award_xp(xp);
        info!(
            habit_id,
            %date,
            current_streak = habit.current_streak,
            xp,
            "habit completion committed"
        );
        self.habits.write().insert(habit.id.clone(), habit);
    }

    fn award_xp(&self, xp: u64) {
        let mut experience = self.experience.write();
        *experience += xp;
    }

    fn surface_commit_error(&self, operation: &str, err: &str) {
        warn!(operation, err, "commit failed; optimistic state retained");
        *self.last_error.write() = Some(format!("{operation}: {err}"));
    }
}
