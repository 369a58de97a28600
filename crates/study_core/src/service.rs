use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    aggregate::{self, FormattedHoursStats, HoursStats},
    error::Result,
    exam::{self, UpcomingExam},
    habit::{self, HabitCompletion, HabitDayStats, HabitStreaks, HabitWeekStat},
    heatmap::{self, Heatmap},
    model::{Habit, Progress, StudyConfig, TaskId},
    next_task::{self, NextTask, NEXT_TASK_LOOKAHEAD_DAYS},
    snapshot,
    subjects::SubjectFilter,
    weeks::{self, current_calendar_week},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSnapshot {
    pub now: NaiveDateTime,
    pub next_task: Option<NextTask>,
    pub today: HoursStats,
    pub current_week: FormattedHoursStats,
    pub today_habits: HabitCompletion,
    pub upcoming_exams: Vec<UpcomingExam>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectSummary {
    pub subject: String,
    #[serde(flatten)]
    pub stats: HoursStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSnapshot {
    pub subjects: Vec<SubjectSummary>,
    pub total_weeks: usize,
    pub weekly_progress: Vec<f64>,
    pub horizon: HoursStats,
    pub habits_this_week: Vec<HabitWeekStat>,
    pub habit_consistency: HabitCompletion,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitOverview {
    #[serde(flatten)]
    pub habit: Habit,
    pub done_today: bool,
    pub streaks: HabitStreaks,
    pub horizon: HabitDayStats,
}

/// Owns the loaded config and progress and answers every statistics query
/// against a consistent snapshot of both.
pub struct StudyService {
    config: RwLock<StudyConfig>,
    progress: RwLock<Progress>,
    progress_path: Option<PathBuf>,
    subject_filter: SubjectFilter,
    lookahead_days: u32,
}

pub struct StudyServiceBuilder {
    config: Option<StudyConfig>,
    config_path: Option<PathBuf>,
    progress: Option<Progress>,
    progress_path: Option<PathBuf>,
    subject_filter: SubjectFilter,
    lookahead_days: u32,
}

impl Default for StudyServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StudyServiceBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            config_path: None,
            progress: None,
            progress_path: None,
            subject_filter: SubjectFilter::default(),
            lookahead_days: NEXT_TASK_LOOKAHEAD_DAYS,
        }
    }

    pub fn with_config(mut self, config: StudyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Config file to load at build time. Takes precedence over [`Self::with_config`].
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Progress file to load at build time and rewrite after every toggle.
    pub fn progress_path(mut self, path: impl AsRef<Path>) -> Self {
        self.progress_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_subject_filter(mut self, filter: SubjectFilter) -> Self {
        self.subject_filter = filter;
        self
    }

    pub fn lookahead_days(mut self, days: u32) -> Self {
        self.lookahead_days = days;
        self
    }

    pub fn build(self) -> Result<StudyService> {
        let config = match &self.config_path {
            Some(path) => snapshot::load_config(path)?,
            None => {
                let config = self.config.unwrap_or_default();
                config.validate()?;
                config
            }
        };
        let progress = match (&self.progress_path, self.progress) {
            (_, Some(progress)) => progress,
            (Some(path), None) => snapshot::load_progress(path)?,
            (None, None) => Progress::default(),
        };
        Ok(StudyService {
            config: RwLock::new(config),
            progress: RwLock::new(progress),
            progress_path: self.progress_path,
            subject_filter: self.subject_filter,
            lookahead_days: self.lookahead_days,
        })
    }
}

impl StudyService {
    pub fn builder() -> StudyServiceBuilder {
        StudyServiceBuilder::new()
    }

    pub fn config(&self) -> StudyConfig {
        self.config.read().clone()
    }

    pub fn progress(&self) -> Progress {
        self.progress.read().clone()
    }

    pub fn subject_filter(&self) -> &SubjectFilter {
        &self.subject_filter
    }

    /// Swaps in a whole new config, as an import or reset does. Progress is
    /// kept; positional task ids keep pointing at whatever now sits there.
    pub fn replace_config(&self, config: StudyConfig) -> Result<()> {
        config.validate()?;
        *self.config.write() = config;
        debug!("study config replaced");
        Ok(())
    }

    pub fn replace_progress(&self, progress: Progress) -> Result<()> {
        *self.progress.write() = progress;
        self.persist_progress()
    }

    #[instrument(skip(self))]
    pub fn toggle_task(&self, id: &TaskId) -> Result<bool> {
        let done = self.progress.write().completed_tasks.toggle(id);
        debug!(done, "task toggled");
        self.persist_progress()?;
        Ok(done)
    }

    #[instrument(skip(self))]
    pub fn toggle_habit(&self, habit_id: &str, date: NaiveDate) -> Result<bool> {
        let done = self
            .progress
            .write()
            .completed_habits
            .toggle(date, habit_id);
        debug!(done, "habit toggled");
        self.persist_progress()?;
        Ok(done)
    }

    pub fn save_progress(&self, path: impl AsRef<Path>) -> Result<()> {
        snapshot::save_progress(path, &self.progress.read())
    }

    pub fn subjects(&self) -> Vec<String> {
        self.subject_filter
            .subjects(&self.config.read().schedule_by_date)
    }

    pub fn next_task(&self, now: NaiveDateTime) -> Option<NextTask> {
        next_task::next_task(&self.config.read().schedule_by_date, now, self.lookahead_days)
    }

    #[instrument(skip(self))]
    pub fn dashboard(&self, now: NaiveDateTime) -> DashboardSnapshot {
        let config = self.config.read();
        let progress = self.progress.read();
        let schedule = &config.schedule_by_date;
        DashboardSnapshot {
            now,
            next_task: next_task::next_task(schedule, now, self.lookahead_days),
            today: aggregate::day_stats(now.date(), schedule, &progress.completed_tasks),
            current_week: aggregate::current_week_stats(schedule, &progress.completed_tasks, now),
            today_habits: habit::today_habit_completion(
                &config.habits,
                &progress.completed_habits,
                now,
            ),
            upcoming_exams: exam::upcoming_exams(&config.exams, now),
        }
    }

    #[instrument(skip(self))]
    pub fn analytics(&self, now: NaiveDateTime) -> AnalyticsSnapshot {
        let config = self.config.read();
        let progress = self.progress.read();
        let schedule = &config.schedule_by_date;
        let completed = &progress.completed_tasks;

        let subjects = self
            .subject_filter
            .subjects(schedule)
            .into_iter()
            .map(|subject| SubjectSummary {
                stats: aggregate::subject_stats(&subject, schedule, completed),
                subject,
            })
            .collect();
        let total_weeks = weeks::schedule_week_count(schedule);

        AnalyticsSnapshot {
            subjects,
            total_weeks,
            weekly_progress: weeks::weekly_progress_data(schedule, completed, total_weeks),
            horizon: aggregate::horizon_stats(schedule, completed),
            habits_this_week: habit::weekly_habit_stats(
                &config.habits,
                &progress.completed_habits,
                now,
            ),
            habit_consistency: habit::weekly_habit_consistency(
                &config.habits,
                &progress.completed_habits,
                now,
            ),
        }
    }

    pub fn habits_overview(&self, now: NaiveDateTime) -> Vec<HabitOverview> {
        let config = self.config.read();
        let progress = self.progress.read();
        let completed = &progress.completed_habits;
        config
            .habits
            .iter()
            .map(|h| HabitOverview {
                habit: h.clone(),
                done_today: completed.is_completed(now.date(), &h.id),
                streaks: habit::habit_streaks(&h.id, completed, &config.schedule_by_date, now),
                horizon: habit::habit_horizon_stats(&h.id, completed, &config.schedule_by_date),
            })
            .collect()
    }

    /// Heatmap for the calendar week `week_offset` weeks away from `now`'s week.
    pub fn heatmap(&self, now: NaiveDateTime, week_offset: i64) -> Heatmap {
        let week = current_calendar_week(now).offset(week_offset);
        heatmap::productivity_heatmap(
            &self.config.read().schedule_by_date,
            &self.progress.read().completed_tasks,
            Some(week),
        )
    }
}

impl StudyService {
    fn persist_progress(&self) -> Result<()> {
        match &self.progress_path {
            Some(path) => snapshot::save_progress(path, &self.progress.read()),
            None => Ok(()),
        }
    }
}
