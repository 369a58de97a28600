//! Two week policies live here and are deliberately separate:
//!
//! * schedule-relative weeks: fixed 7-day blocks counted from the earliest
//!   scheduled day, whatever weekday that is;
//! * calendar weeks: Monday to Sunday, containing some real date.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::aggregate::{range_stats, HoursStats};
use crate::date_key::{day_initial, format_date_key, parse_date_key, weekday_index};
use crate::model::{CompletedTasks, Schedule};

/// First and last scheduled day. Keys that are not valid dates are ignored.
pub fn schedule_horizon(schedule: &Schedule) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = schedule.keys().filter_map(|key| parse_date_key(key));
    let first = dates.next()?;
    let (start, end) = dates.fold((first, first), |(lo, hi), date| (lo.min(date), hi.max(date)));
    Some((start, end))
}

pub fn schedule_start(schedule: &Schedule) -> Option<NaiveDate> {
    schedule_horizon(schedule).map(|(start, _)| start)
}

/// Number of 7-day blocks needed to cover the horizon; 0 for an empty schedule.
pub fn schedule_week_count(schedule: &Schedule) -> usize {
    let Some((start, end)) = schedule_horizon(schedule) else {
        return 0;
    };
    let days = (end - start).num_days() as usize + 1;
    days.div_ceil(7)
}

/// Week `index` counted from the schedule's first day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleWeek {
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ScheduleWeek {
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        seven_days(self.start)
    }
}

/// Window `[first + 7 * index, first + 7 * index + 6]`. Indices past
/// [`schedule_week_count`] still produce a window; `None` only when the
/// schedule is empty or the arithmetic leaves chrono's range.
pub fn schedule_relative_week(schedule: &Schedule, index: usize) -> Option<ScheduleWeek> {
    let first = schedule_start(schedule)?;
    let offset = i64::try_from(index).ok()?.checked_mul(7)?;
    let start = first.checked_add_signed(Duration::days(offset))?;
    let end = start.checked_add_signed(Duration::days(6))?;
    Some(ScheduleWeek { index, start, end })
}

pub fn weekly_stats(index: usize, schedule: &Schedule, completed: &CompletedTasks) -> HoursStats {
    match schedule_relative_week(schedule, index) {
        Some(week) => range_stats(week.days(), schedule, completed),
        None => HoursStats::default(),
    }
}

/// Completed hours for weeks `0..total_weeks`, recomputed on each call.
pub fn weekly_progress_data(
    schedule: &Schedule,
    completed: &CompletedTasks,
    total_weeks: usize,
) -> Vec<f64> {
    (0..total_weeks)
        .map(|index| weekly_stats(index, schedule, completed).completed_hours)
        .collect()
}

/// Monday-start week. Sunday belongs to the week that began six days earlier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CalendarWeek {
    start: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeekDay {
    pub date_key: String,
    pub initial: char,
}

impl CalendarWeek {
    pub fn containing(date: NaiveDate) -> Self {
        let back = date.weekday().num_days_from_monday() as i64;
        Self {
            start: date - Duration::days(back),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(6)
    }

    pub fn offset(&self, weeks: i64) -> Self {
        Self {
            start: self.start + Duration::weeks(weeks),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        seven_days(self.start)
    }

    pub fn day_labels(&self) -> Vec<WeekDay> {
        self.days()
            .map(|date| WeekDay {
                date_key: format_date_key(date),
                initial: day_initial(weekday_index(date)),
            })
            .collect()
    }
}

pub fn current_calendar_week(now: NaiveDateTime) -> CalendarWeek {
    CalendarWeek::containing(now.date())
}

fn seven_days(start: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take(7)
}
