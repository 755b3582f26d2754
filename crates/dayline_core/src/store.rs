use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use thiserror::Error;

use crate::model::{HabitRecord, TaskRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Persistence collaborator for the scheduling core. Implementations own
/// retry, auth and backoff; the core calls these fire-and-forget from the
/// undo-commit step and synchronously during reloads.
pub trait PlannerStore: Send + Sync {
    fn list_tasks_for_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>, StoreError>;
    fn create_task(&self, task: &TaskRecord) -> Result<(), StoreError>;
    fn update_task(&self, task: &TaskRecord) -> Result<(), StoreError>;
    fn delete_task(&self, task_id: &str) -> Result<(), StoreError>;

    fn list_habits(&self) -> Result<Vec<HabitRecord>, StoreError>;
    fn update_habit(&self, habit: &HabitRecord) -> Result<(), StoreError>;
    fn habit_completions(&self, habit_id: &str) -> Result<Vec<NaiveDate>, StoreError>;
    fn set_habit_occurrence_completed(
        &self,
        habit_id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<(), StoreError>;
}

impl<S: PlannerStore> PlannerStore for std::sync::Arc<S> {
    fn list_tasks_for_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>, StoreError> {
        (**self).list_tasks_for_range(start, end)
    }

    fn create_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        (**self).create_task(task)
    }

    fn update_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        (**self).update_task(task)
    }

    fn delete_task(&self, task_id: &str) -> Result<(), StoreError> {
        (**self).delete_task(task_id)
    }

    fn list_habits(&self) -> Result<Vec<HabitRecord>, StoreError> {
        (**self).list_habits()
    }

    fn update_habit(&self, habit: &HabitRecord) -> Result<(), StoreError> {
        (**self).update_habit(habit)
    }

    fn habit_completions(&self, habit_id: &str) -> Result<Vec<NaiveDate>, StoreError> {
        (**self).habit_completions(habit_id)
    }

    fn set_habit_occurrence_completed(
        &self,
        habit_id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<(), StoreError> {
        (**self).set_habit_occurrence_completed(habit_id, date, completed)
    }
}

/// In-memory reference backend, used by the test suite and as the default
/// store for ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    habits: RwLock<HashMap<String, HabitRecord>>,
    completions: RwLock<HashMap<String, BTreeSet<NaiveDate>>>,
    fail_writes: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_habits(habits: Vec<HabitRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.habits.write();
            for habit in habits {
                map.insert(habit.id.clone(), habit);
            }
        }
        store
    }

    /// Makes every subsequent write fail, for exercising commit-failure paths.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.write() = fail;
    }

    pub fn task(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.read().get(task_id).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn completion_exists(&self, habit_id: &str, date: NaiveDate) -> bool {
        self.completions
            .read()
            .get(habit_id)
            .is_some_and(|dates| dates.contains(&date))
    }

    fn guard_writes(&self) -> Result<(), StoreError> {
        if *self.fail_writes.read() {
            return Err(StoreError::Backend("simulated write failure".to_string()));
        }
        Ok(())
    }
}

impl PlannerStore for MemoryStore {
    fn list_tasks_for_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>, StoreError> {
        let mut tasks: Vec<TaskRecord> = self
            .tasks
            .read()
            .values()
            .filter(|task| task.scheduled_at >= start && task.scheduled_at < end)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
        Ok(tasks)
    }

    fn create_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        self.guard_writes()?;
        self.tasks.write().insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn update_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        self.guard_writes()?;
        let mut tasks = self.tasks.write();
        if !tasks.contains_key(&task.id) {
            return Err(StoreError::NotFound(task.id.clone()));
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn delete_task(&self, task_id: &str) -> Result<(), StoreError> {
        self.guard_writes()?;
        self.tasks
            .write()
            .remove(task_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))
    }

    fn list_habits(&self) -> Result<Vec<HabitRecord>, StoreError> {
        let mut habits: Vec<HabitRecord> = self.habits.read().values().cloned().collect();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(habits)
    }

    fn update_habit(&self, habit: &HabitRecord) -> Result<(), StoreError> {
        self.guard_writes()?;
        let mut habits = self.habits.write();
        if !habits.contains_key(&habit.id) {
            return Err(StoreError::NotFound(habit.id.clone()));
        }
        habits.insert(habit.id.clone(), habit.clone());
        Ok(())
    }

    fn habit_completions(&self, habit_id: &str) -> Result<Vec<NaiveDate>, StoreError> {
        Ok(self
            .completions
            .read()
            .get(habit_id)
            .map(|dates| dates.iter().copied().collect())
            .unwrap_or_default())
    }

    fn set_habit_occurrence_completed(
        &self,
        habit_id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<(), StoreError> {
        self.guard_writes()?;
        if !self.habits.read().contains_key(habit_id) {
            return Err(StoreError::NotFound(habit_id.to_string()));
        }
        let mut completions = self.completions.write();
        let dates = completions.entry(habit_id.to_string()).or_default();
        if completed {
            dates.insert(date);
        } else {
            dates.remove(&date);
        }
        Ok(())
    }
}
