use std::collections::BTreeMap;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::date_key::weekday_index;
use crate::model::{CompletedTasks, Schedule, TaskId};
use crate::next_task::parse_task_time;
use crate::weeks::CalendarWeek;

/// Weekday (Sunday = 0) and hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeatmapSlot {
    pub weekday: u32,
    pub hour: u32,
}

/// Completed study hours bucketed by weekday and hour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Heatmap {
    cells: BTreeMap<HeatmapSlot, f64>,
}

impl Heatmap {
    pub fn get(&self, weekday: u32, hour: u32) -> f64 {
        self.cells
            .get(&HeatmapSlot { weekday, hour })
            .copied()
            .unwrap_or(0.0)
    }

    pub fn cells(&self) -> impl Iterator<Item = (HeatmapSlot, f64)> + '_ {
        self.cells.iter().map(|(slot, hours)| (*slot, *hours))
    }

    /// Largest cell, never below 1.0 so it can scale colours directly.
    pub fn max(&self) -> f64 {
        self.cells.values().copied().fold(1.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn add(&mut self, weekday: u32, hour: u32, hours: f64) {
        *self.cells.entry(HeatmapSlot { weekday, hour }).or_insert(0.0) += hours;
    }
}

/// Spreads every completed task's `start..end` span over the hour slots it
/// touches. Restricting to `week` keeps only tasks on that week's days.
///
/// Records whose id does not resolve to a scheduled task, or whose times do
/// not parse, are skipped.
pub fn productivity_heatmap(
    schedule: &Schedule,
    completed: &CompletedTasks,
    week: Option<CalendarWeek>,
) -> Heatmap {
    let mut heatmap = Heatmap::default();

    for key in completed.completed_keys() {
        let Ok(id) = key.parse::<TaskId>() else {
            tracing::debug!(key, "ignoring completion record with malformed id");
            continue;
        };
        let Some(date) = id.date() else {
            continue;
        };
        if week.is_some_and(|week| !week.contains(date)) {
            continue;
        }
        let Some(task) = schedule
            .get(&id.date_key)
            .and_then(|tasks| tasks.get(id.index))
        else {
            continue;
        };
        let (Some(start), Some(end)) = (parse_task_time(&task.start), parse_task_time(&task.end))
        else {
            continue;
        };

        let weekday = weekday_index(date);
        let (start_hour, start_minute) = (start.hour(), f64::from(start.minute()));
        let (end_hour, end_minute) = (end.hour(), f64::from(end.minute()));

        for hour in start_hour..=end_hour.min(23) {
            let slice = if hour == start_hour && hour == end_hour {
                (end_minute - start_minute) / 60.0
            } else if hour == start_hour {
                (60.0 - start_minute) / 60.0
            } else if hour == end_hour {
                end_minute / 60.0
            } else {
                1.0
            };
            if slice > 0.0 {
                heatmap.add(weekday, hour, slice);
            }
        }
    }

    heatmap
}
