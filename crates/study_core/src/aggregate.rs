use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::date_key::{format_date_key, parse_date_key};
use crate::model::{CompletedTasks, Schedule, ScheduleTask, TaskId};
use crate::weeks::current_calendar_week;

/// Scheduled versus checked-off hours over some slice of the schedule.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct HoursStats {
    pub total_hours: f64,
    pub completed_hours: f64,
    pub percentage: u8,
}

/// [`HoursStats`] with the hours rendered to one decimal, as the dashboard shows them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormattedHoursStats {
    pub total_hours: String,
    pub completed_hours: String,
    pub percentage: u8,
}

impl HoursStats {
    fn from_sums(total_hours: f64, completed_hours: f64) -> Self {
        Self {
            total_hours,
            completed_hours,
            percentage: percentage(completed_hours, total_hours),
        }
    }

    pub fn formatted(&self) -> FormattedHoursStats {
        FormattedHoursStats {
            total_hours: one_decimal(self.total_hours),
            completed_hours: one_decimal(self.completed_hours),
            percentage: self.percentage,
        }
    }
}

/// Formats hours to one decimal, rounding ties away from zero (`2.25` -> `"2.3"`).
/// Plain `{:.1}` would round half to even.
fn one_decimal(hours: f64) -> String {
    format!("{:.1}", (hours * 10.0).round() / 10.0)
}

/// Rounded share of `part` in `total`, clamped to `0..=100`. Zero totals give 0.
pub fn percentage(part: f64, total: f64) -> u8 {
    if !total.is_finite() || total <= 0.0 {
        return 0;
    }
    (part / total * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Same as [`percentage`] for counts.
pub fn count_percentage(part: usize, total: usize) -> u8 {
    percentage(part as f64, total as f64)
}

#[derive(Default)]
struct HoursAccumulator {
    total: f64,
    completed: f64,
}

impl HoursAccumulator {
    fn add_day<F>(&mut self, date_key: &str, schedule: &Schedule, completed: &CompletedTasks, keep: F)
    where
        F: Fn(&ScheduleTask) -> bool,
    {
        let Some(tasks) = schedule.get(date_key) else {
            return;
        };
        for (idx, task) in tasks.iter().enumerate() {
            if !keep(task) {
                continue;
            }
            self.total += task.hours;
            if completed.is_completed(&TaskId::new(date_key, idx)) {
                self.completed += task.hours;
            }
        }
    }

    fn finish(self) -> HoursStats {
        HoursStats::from_sums(self.total, self.completed)
    }
}

/// Hours of every task whose subject is exactly `subject`. No prefix or
/// case folding: `"Termo"` does not match `"Termo (Cursada)"`. Days whose
/// key is not a date are skipped, as in [`horizon_stats`].
pub fn subject_stats(subject: &str, schedule: &Schedule, completed: &CompletedTasks) -> HoursStats {
    let mut acc = HoursAccumulator::default();
    for date_key in dated_keys(schedule) {
        acc.add_day(date_key, schedule, completed, |task| task.subject == subject);
    }
    acc.finish()
}

/// Hours over an arbitrary set of days. Days without schedule entries add nothing.
pub fn range_stats<I>(dates: I, schedule: &Schedule, completed: &CompletedTasks) -> HoursStats
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut acc = HoursAccumulator::default();
    for date in dates {
        acc.add_day(&format_date_key(date), schedule, completed, |_| true);
    }
    acc.finish()
}

pub fn day_stats(date: NaiveDate, schedule: &Schedule, completed: &CompletedTasks) -> HoursStats {
    range_stats(std::iter::once(date), schedule, completed)
}

/// Hours over the whole schedule, first to last scheduled day.
pub fn horizon_stats(schedule: &Schedule, completed: &CompletedTasks) -> HoursStats {
    let mut acc = HoursAccumulator::default();
    for date_key in dated_keys(schedule) {
        acc.add_day(date_key, schedule, completed, |_| true);
    }
    acc.finish()
}

fn dated_keys(schedule: &Schedule) -> impl Iterator<Item = &String> {
    schedule.keys().filter(|key| parse_date_key(key).is_some())
}

/// Hours in the Monday-start calendar week containing `now`.
pub fn current_week_stats(
    schedule: &Schedule,
    completed: &CompletedTasks,
    now: NaiveDateTime,
) -> FormattedHoursStats {
    range_stats(current_calendar_week(now).days(), schedule, completed).formatted()
}
