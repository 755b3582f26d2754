use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::TaskRecord;

/// A user mutation that has already been applied to local state and can still
/// be cancelled while its undo window is open. Snapshots carry the pre-change
/// record so a revert is a plain reinsert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum UndoableAction {
    CompleteTask { snapshot: TaskRecord },
    CompleteHabit { habit_id: String, date: NaiveDate },
    DeleteTask { snapshot: TaskRecord },
}

impl UndoableAction {
    pub fn message(&self) -> String {
        match self {
            UndoableAction::CompleteTask { snapshot } => {
                format!("Completed \u{201c}{}\u{201d}", snapshot.title)
            }
            UndoableAction::CompleteHabit { date, .. } => format!("Habit checked off for {date}"),
            UndoableAction::DeleteTask { snapshot } => {
                format!("Deleted \u{201c}{}\u{201d}", snapshot.title)
            }
        }
    }

    fn is_delete(&self) -> bool {
        matches!(self, UndoableAction::DeleteTask { .. })
    }
}

#[derive(Debug)]
struct OpenWindow {
    action: UndoableAction,
    opened_at: Instant,
    deadline: Instant,
}

/// Coordinates the "optimistic change + cancellable undo window" pattern.
///
/// Single-threaded and poll-driven: the owner applies the mutation to local
/// state first, then calls [`begin`](Self::begin); the UI loop calls
/// [`poll`](Self::poll) on its tick until the window resolves. Exactly one
/// action can be open at a time. Progress sampling exists for UI smoothness
/// only; resolution depends solely on the deadline, not on tick granularity.
#[derive(Debug)]
pub struct MutationCoordinator {
    window: Duration,
    tick: Duration,
    open: Option<OpenWindow>,
}

impl MutationCoordinator {
    pub fn new(window: Duration, tick: Duration) -> Self {
        Self {
            window,
            tick,
            open: None,
        }
    }

    /// Suggested progress-sampling cadence for the UI countdown.
    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Message for the currently open undo affordance, if any.
    pub fn message(&self) -> Option<String> {
        self.open.as_ref().map(|open| open.action.message())
    }

    /// Fraction of the undo window elapsed, in `0.0..=1.0`.
    pub fn progress(&self, now: Instant) -> Option<f32> {
        let open = self.open.as_ref()?;
        let elapsed = now.saturating_duration_since(open.opened_at).as_secs_f32();
        Some((elapsed / self.window.as_secs_f32()).clamp(0.0, 1.0))
    }

    /// Opens an undo window for `action`, forcing resolution of any action
    /// still pending. A pending delete is returned so the caller commits it
    /// immediately (deletions are never silently dropped); any other pending
    /// kind is simply replaced.
    #[must_use]
    pub fn begin(&mut self, action: UndoableAction, now: Instant) -> Option<UndoableAction> {
        let superseded = self.open.take().map(|open| open.action);
        let forced = match superseded {
            Some(prior) if prior.is_delete() => Some(prior),
            Some(prior) => {
                debug!(message = %prior.message(), "pending action replaced");
                None
            }
            None => None,
        };
        self.open = Some(OpenWindow {
            action,
            opened_at: now,
            deadline: now + self.window,
        });
        forced
    }

    /// Resolves the open window to `Committed` once the deadline has elapsed,
    /// handing the action back for its real side effect. Safe to call at any
    /// cadence, including after resolution.
    #[must_use]
    pub fn poll(&mut self, now: Instant) -> Option<UndoableAction> {
        match &self.open {
            Some(open) if now >= open.deadline => self.open.take().map(|open| open.action),
            _ => None,
        }
    }

    /// Explicit undo before the deadline. Returns the action so the caller can
    /// restore the prior local state; the side effect is never invoked. After
    /// the deadline, or with no open window, this is a no-op.
    #[must_use]
    pub fn undo(&mut self, now: Instant) -> Option<UndoableAction> {
        match &self.open {
            Some(open) if now < open.deadline => self.open.take().map(|open| open.action),
            _ => None,
        }
    }

    /// Teardown path: hands back whatever is still pending so a delete can be
    /// flushed to the store instead of vanishing with the screen. Idempotent.
    #[must_use]
    pub fn flush(&mut self) -> Option<UndoableAction> {
        self.open.take().map(|open| open.action)
    }
}
