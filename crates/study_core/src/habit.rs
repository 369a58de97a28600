//! Streaks and completion ratios for daily habits.
//!
//! Habits have no calendar of their own: they borrow the schedule's horizon,
//! so no day before the first scheduled day counts toward anything.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::aggregate::count_percentage;
use crate::model::{CompletedHabits, Habit, Schedule};
use crate::weeks::{current_calendar_week, schedule_horizon, schedule_start};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitStreaks {
    pub current: u32,
    pub best: u32,
}

/// `completed` out of `total` with the rounded percentage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitCompletion {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

impl HabitCompletion {
    fn new(completed: usize, total: usize) -> Self {
        Self {
            completed,
            total,
            percentage: count_percentage(completed, total),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitWeekStat {
    #[serde(flatten)]
    pub habit: Habit,
    pub completed_this_week: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitDayStats {
    pub total_days: usize,
    pub completed_days: usize,
    pub percentage: u8,
}

/// Current and best streak over `[schedule start, today]`.
///
/// Days without a record break a streak. The current streak is counted
/// backwards from today, and today itself never breaks it: an unmarked today
/// leaves the run ending yesterday intact.
pub fn habit_streaks(
    habit_id: &str,
    completed: &CompletedHabits,
    schedule: &Schedule,
    now: NaiveDateTime,
) -> HabitStreaks {
    let Some(start) = schedule_start(schedule) else {
        return HabitStreaks::default();
    };
    let today = now.date();

    let mut best = 0;
    let mut run = 0;
    for day in start.iter_days().take_while(|day| *day <= today) {
        if completed.is_completed(day, habit_id) {
            run += 1;
        } else {
            best = best.max(run);
            run = 0;
        }
    }
    best = best.max(run);

    let mut current = 0;
    let mut day = today;
    let mut is_today = true;
    while day >= start {
        let done = completed.is_completed(day, habit_id);
        if done {
            current += 1;
        } else if !is_today {
            break;
        }
        is_today = false;
        match day.checked_sub_signed(Duration::days(1)) {
            Some(previous) => day = previous,
            None => break,
        }
    }

    HabitStreaks { current, best }
}

/// Habits checked off on `now`'s day against the size of the roster.
///
/// `completed` counts every `true` record for the day, including ids no
/// longer in `habits`.
pub fn today_habit_completion(
    habits: &[Habit],
    completed: &CompletedHabits,
    now: NaiveDateTime,
) -> HabitCompletion {
    HabitCompletion::new(completed.completed_count_on(now.date()), habits.len())
}

/// Days each habit was checked off in the calendar week containing `now`.
pub fn weekly_habit_stats(
    habits: &[Habit],
    completed: &CompletedHabits,
    now: NaiveDateTime,
) -> Vec<HabitWeekStat> {
    let week = current_calendar_week(now);
    habits
        .iter()
        .map(|habit| HabitWeekStat {
            habit: habit.clone(),
            completed_this_week: week
                .days()
                .filter(|day| completed.is_completed(*day, &habit.id))
                .count(),
        })
        .collect()
}

/// All check-offs of the calendar week over `habits × 7`.
pub fn weekly_habit_consistency(
    habits: &[Habit],
    completed: &CompletedHabits,
    now: NaiveDateTime,
) -> HabitCompletion {
    let done = weekly_habit_stats(habits, completed, now)
        .iter()
        .map(|stat| stat.completed_this_week)
        .sum();
    HabitCompletion::new(done, habits.len() * 7)
}

/// Days the habit was done across the full schedule horizon, first to last day.
pub fn habit_horizon_stats(
    habit_id: &str,
    completed: &CompletedHabits,
    schedule: &Schedule,
) -> HabitDayStats {
    let Some((start, end)) = schedule_horizon(schedule) else {
        return HabitDayStats::default();
    };
    let days: Vec<NaiveDate> = start.iter_days().take_while(|day| *day <= end).collect();
    let completed_days = days
        .iter()
        .filter(|day| completed.is_completed(**day, habit_id))
        .count();
    HabitDayStats {
        total_days: days.len(),
        completed_days,
        percentage: count_percentage(completed_days, days.len()),
    }
}
