use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_key::{format_date_key, parse_date_key};
use crate::error::{Error, Result};

/// One block of study (or anything else) on a given day.
///
/// `hours` is whatever the user entered. It is never recomputed from
/// `start`/`end`, and every total in the crate sums this field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleTask {
    pub start: String,
    pub end: String,
    pub subject: String,
    pub task: String,
    pub hours: f64,
}

/// Date key to the day's tasks. Keys iterate in date order because
/// `YYYY-MM-DD` sorts lexicographically.
pub type Schedule = BTreeMap<String, Vec<ScheduleTask>>;

/// Positional identity of a scheduled task: `{date_key}-{index}`.
///
/// Reordering or deleting tasks within a day reassigns these ids, so stored
/// completion records follow the position, not the task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId {
    pub date_key: String,
    pub index: usize,
}

impl TaskId {
    pub fn new(date_key: impl Into<String>, index: usize) -> Self {
        Self {
            date_key: date_key.into(),
            index,
        }
    }

    pub fn for_date(date: NaiveDate, index: usize) -> Self {
        Self::new(format_date_key(date), index)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        parse_date_key(&self.date_key)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.date_key, self.index)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (date_key, index) = s
            .rsplit_once('-')
            .ok_or_else(|| Error::InvalidTaskId(s.to_string()))?;
        let index = index
            .parse::<usize>()
            .map_err(|_| Error::InvalidTaskId(s.to_string()))?;
        if parse_date_key(date_key).is_none() {
            return Err(Error::InvalidTaskId(s.to_string()));
        }
        Ok(Self::new(date_key, index))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub critical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exam {
    pub name: String,
    /// ISO datetime as written in the config, e.g. `2025-12-01T12:00:00`.
    pub date: String,
    pub subject: String,
    pub priority: u8,
}

/// Sparse task check-offs. Absent and `false` both mean "not done".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CompletedTasks(BTreeMap<String, bool>);

impl CompletedTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, id: &TaskId) -> bool {
        self.is_completed_key(&id.to_string())
    }

    pub fn is_completed_key(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn set(&mut self, id: &TaskId, done: bool) {
        self.0.insert(id.to_string(), done);
    }

    /// Flips the record and returns the new state.
    pub fn toggle(&mut self, id: &TaskId) -> bool {
        let next = !self.is_completed(id);
        self.set(id, next);
        next
    }

    /// Raw keys of every record marked `true`, in key order.
    pub fn completed_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, done)| **done)
            .map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, bool)> for CompletedTasks {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Sparse habit check-offs: date key, then habit id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CompletedHabits(BTreeMap<String, BTreeMap<String, bool>>);

impl CompletedHabits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, date: NaiveDate, habit_id: &str) -> bool {
        self.0
            .get(&format_date_key(date))
            .and_then(|day| day.get(habit_id))
            .copied()
            .unwrap_or(false)
    }

    /// Number of `true` entries recorded for `date`, whether or not the habit
    /// ids still exist in the roster.
    pub fn completed_count_on(&self, date: NaiveDate) -> usize {
        self.0
            .get(&format_date_key(date))
            .map(|day| day.values().filter(|done| **done).count())
            .unwrap_or(0)
    }

    pub fn set(&mut self, date: NaiveDate, habit_id: &str, done: bool) {
        self.0
            .entry(format_date_key(date))
            .or_default()
            .insert(habit_id.to_string(), done);
    }

    pub fn toggle(&mut self, date: NaiveDate, habit_id: &str) -> bool {
        let next = !self.is_completed(date, habit_id);
        self.set(date, habit_id, next);
        next
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, BTreeMap<String, bool>)> for CompletedHabits {
    fn from_iter<I: IntoIterator<Item = (String, BTreeMap<String, bool>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything the user configures: exams, habits and the schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyConfig {
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub schedule_by_date: Schedule,
}

impl StudyConfig {
    /// Rejects shapes the statistics cannot make sense of. Malformed date keys
    /// and task start times are tolerated here; the engine skips them.
    pub fn validate(&self) -> Result<()> {
        for exam in &self.exams {
            if !(1..=3).contains(&exam.priority) {
                return Err(Error::InvalidConfig(format!(
                    "exam `{}` has priority {}, expected 1..=3",
                    exam.name, exam.priority
                )));
            }
        }

        let mut seen = HashSet::new();
        for habit in &self.habits {
            if habit.id.trim().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "habit `{}` has an empty id",
                    habit.name
                )));
            }
            if !seen.insert(habit.id.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate habit id `{}`",
                    habit.id
                )));
            }
        }

        for (date_key, tasks) in &self.schedule_by_date {
            for (idx, task) in tasks.iter().enumerate() {
                if !task.hours.is_finite() || task.hours < 0.0 {
                    return Err(Error::InvalidConfig(format!(
                        "task {}-{} has invalid hours {}",
                        date_key, idx, task.hours
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The user's check-offs, persisted next to the config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub completed_tasks: CompletedTasks,
    #[serde(default)]
    pub completed_habits: CompletedHabits,
}
