use serde::{Deserialize, Serialize};

/// Level curve: each level costs 35% more than the one before it.
pub fn xp_needed_for_level(level: u32) -> u64 {
    let normalized = level.max(1);
    let needed = (200.0 * 1.35_f64.powi(normalized as i32 - 1)).round() as u64;
    needed.max(1)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelProgress {
    pub experience_points: u64,
    pub level: u32,
    pub xp_into_level: u64,
    pub xp_for_next_level: u64,
    pub xp_to_next_level: u64,
}

/// Resolves a lifetime XP total into the current level and the progress
/// toward the next one.
pub fn progress_from_experience(total_xp: u64) -> LevelProgress {
    let mut level = 1u32;
    let mut remaining = total_xp;
    let mut needed = xp_needed_for_level(level);
    while remaining >= needed {
        remaining -= needed;
        level += 1;
        needed = xp_needed_for_level(level);
    }
    LevelProgress {
        experience_points: total_xp,
        level,
        xp_into_level: remaining,
        xp_for_next_level: needed,
        xp_to_next_level: needed - remaining,
    }
}

/// One-shot bonus the first time a streak reaches a milestone length.
pub fn streak_milestone_bonus(streak: u32) -> i64 {
    match streak {
        3 => 10,
        7 => 25,
        14 => 55,
        30 => 120,
        _ => 0,
    }
}

/// Reward for finishing close to (or under) the planned duration; finishing
/// far over it costs a little. Habits are graded slightly more generously.
fn duration_efficiency_bonus(
    planned_minutes: Option<u32>,
    actual_minutes: Option<u32>,
    habit: bool,
) -> i64 {
    let Some(planned) = planned_minutes.filter(|m| *m > 0) else {
        return 0;
    };
    let Some(actual) = actual_minutes.filter(|m| *m > 0) else {
        return 0;
    };

    let ratio = actual as f64 / planned as f64;
    if ratio <= 0.85 {
        if habit { 18 } else { 14 }
    } else if ratio <= 1.0 {
        if habit { 14 } else { 10 }
    } else if ratio <= 1.15 {
        if habit { 10 } else { 7 }
    } else if ratio <= 1.35 {
        if habit { 4 } else { 2 }
    } else if ratio <= 1.65 {
        0
    } else if habit {
        -8
    } else {
        -6
    }
}

pub struct TaskCompletion {
    pub priority_level: i32,
    pub planned_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,
    pub completed_on_time: bool,
    pub completion_streak: u32,
}

pub fn task_completion_xp(completion: &TaskCompletion) -> u64 {
    let priority_bonus = match completion.priority_level {
        1 => 6,
        2 => 14,
        3 => 24,
        _ => 10,
    };
    let duration_bonus =
        ((completion.planned_minutes.unwrap_or(0) as f64 * 0.25).round() as i64).min(40);
    let efficiency_bonus = duration_efficiency_bonus(
        completion.planned_minutes,
        completion.actual_minutes,
        false,
    );
    let on_time_bonus = if completion.completed_on_time { 16 } else { 0 };
    let streak_bonus = streak_milestone_bonus(completion.completion_streak);

    let total = 35 + priority_bonus + duration_bonus + efficiency_bonus + on_time_bonus + streak_bonus;
    total.max(10) as u64
}

pub struct HabitCompletion {
    pub planned_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,
    pub completed_on_time: bool,
    pub habit_streak: u32,
}

pub fn habit_completion_xp(completion: &HabitCompletion) -> u64 {
    let duration_bonus =
        ((completion.planned_minutes.unwrap_or(0) as f64 * 0.35).round() as i64).min(60);
    let efficiency_bonus =
        duration_efficiency_bonus(completion.planned_minutes, completion.actual_minutes, true);
    let on_time_bonus = if completion.completed_on_time { 24 } else { 8 };
    let streak_bonus = streak_milestone_bonus(completion.habit_streak);
    let consistency_bonus = ((completion.habit_streak as f64 * 1.5).floor() as i64).min(25);

    let total =
        55 + duration_bonus + efficiency_bonus + on_time_bonus + streak_bonus + consistency_bonus;
    total.max(18) as u64
}
