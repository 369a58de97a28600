use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::date_key::format_date_key;
use crate::model::{Schedule, ScheduleTask, TaskId};

pub const NEXT_TASK_LOOKAHEAD_DAYS: u32 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NextTask {
    pub id: TaskId,
    pub task: ScheduleTask,
    pub starts_at: NaiveDateTime,
}

/// Parses a task's `HH:MM` start or end time.
pub fn parse_task_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Earliest task starting strictly after `now`, looking at today and the
/// following `lookahead_days` days. Ties keep the task seen first.
pub fn next_task(schedule: &Schedule, now: NaiveDateTime, lookahead_days: u32) -> Option<NextTask> {
    let mut closest: Option<(NaiveDateTime, TaskId, &ScheduleTask)> = None;

    for offset in 0..=i64::from(lookahead_days) {
        let Some(day) = now.date().checked_add_signed(Duration::days(offset)) else {
            break;
        };
        let date_key = format_date_key(day);
        let Some(tasks) = schedule.get(&date_key) else {
            continue;
        };
        for (idx, task) in tasks.iter().enumerate() {
            let Some(start) = parse_task_time(&task.start) else {
                tracing::warn!(
                    date_key = %date_key,
                    index = idx,
                    start = %task.start,
                    "skipping task with unreadable start time"
                );
                continue;
            };
            let starts_at = day.and_time(start);
            if starts_at <= now {
                continue;
            }
            if closest
                .as_ref()
                .map_or(true, |(best, _, _)| starts_at < *best)
            {
                closest = Some((starts_at, TaskId::new(date_key.as_str(), idx), task));
            }
        }
    }

    closest.map(|(starts_at, id, task)| NextTask {
        id,
        task: task.clone(),
        starts_at,
    })
}
