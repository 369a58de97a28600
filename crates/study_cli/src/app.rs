use std::fmt::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use study_core::{
    date_key::{day_name, format_date_key, parse_date_key},
    heatmap::Heatmap,
    model::TaskId,
    next_task::NEXT_TASK_LOOKAHEAD_DAYS,
    service::{AnalyticsSnapshot, DashboardSnapshot, HabitOverview},
    subjects::SubjectFilter,
    StudyService,
};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) progress_path: Option<PathBuf>,
    pub(crate) now: Option<NaiveDateTime>,
    pub(crate) lookahead_days: u32,
    pub(crate) output: OutputFormat,
    pub(crate) extra_excluded_subjects: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            progress_path: None,
            now: None,
            lookahead_days: NEXT_TASK_LOOKAHEAD_DAYS,
            output: OutputFormat::Text,
            extra_excluded_subjects: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. Unparseable values are
    /// logged and the default kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup("STUDY_CONFIG") {
            config.config_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("STUDY_PROGRESS") {
            config.progress_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("STUDY_NOW") {
            match parse_now(&raw) {
                Some(now) => config.now = Some(now),
                None => warn!(value = %raw, "ignoring unparseable STUDY_NOW"),
            }
        }
        if let Some(days) = lookup("STUDY_LOOKAHEAD_DAYS") {
            if let Ok(value) = days.trim().parse::<u32>() {
                if value > 0 {
                    config.lookahead_days = value;
                }
            }
        }
        if let Some(format) = lookup("STUDY_OUTPUT") {
            match format.trim().to_ascii_lowercase().as_str() {
                "json" => config.output = OutputFormat::Json,
                "text" | "" => config.output = OutputFormat::Text,
                other => warn!(format = other, "unknown STUDY_OUTPUT, using text"),
            }
        }
        if let Some(list) = lookup("STUDY_EXTRA_EXCLUDED_SUBJECTS") {
            config.extra_excluded_subjects = list
                .split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(config)
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(|| Local::now().naive_local())
    }

    pub(crate) fn subject_filter(&self) -> SubjectFilter {
        self.extra_excluded_subjects
            .iter()
            .fold(SubjectFilter::default(), |filter, label| filter.exclude(label.as_str()))
    }

    pub fn build_service(&self) -> Result<StudyService> {
        let mut builder = StudyService::builder()
            .lookahead_days(self.lookahead_days)
            .with_subject_filter(self.subject_filter());
        match &self.config_path {
            Some(path) => {
                info!(path = %path.display(), "loading study config");
                builder = builder.config_path(path);
            }
            None => warn!("STUDY_CONFIG not set, starting with an empty schedule"),
        }
        if let Some(path) = &self.progress_path {
            builder = builder.progress_path(path);
        }
        builder.build().context("failed to load study data")
    }
}

fn parse_now(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_date_key(raw).and_then(|date| date.and_hms_opt(0, 0, 0)))
}

/// Study planner dashboard. Data files, "now" and the output format come
/// from the `STUDY_*` environment variables.
#[derive(Debug, Parser)]
#[command(name = "study", version, about = "Study planner dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The requested command, `dashboard` when none was given.
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Dashboard)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Next task, today's and this week's hours, habits and upcoming exams.
    Dashboard,

    /// Per-subject and per-week progress plus habit consistency.
    Analytics,

    /// Streaks and totals for every habit.
    Habits,

    /// Completed hours by weekday and hour.
    Heatmap {
        /// Weeks away from the current one; negative pages back.
        #[arg(default_value_t = 0, allow_negative_numbers = true)]
        week_offset: i64,
    },

    /// Check off a task, or un-check it.
    ToggleTask {
        /// Task id, `YYYY-MM-DD-<index>`.
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },

    /// Check off a habit for a day, or un-check it.
    ToggleHabit {
        habit_id: String,

        /// Day as `YYYY-MM-DD`; defaults to today.
        #[arg(value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

fn parse_task_id(raw: &str) -> std::result::Result<TaskId, String> {
    raw.parse().map_err(|err: study_core::Error| err.to_string())
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    parse_date_key(raw).ok_or_else(|| format!("invalid date `{raw}`, expected YYYY-MM-DD"))
}

pub fn run(config: AppConfig, command: Command) -> Result<String> {
    let service = config.build_service()?;
    let now = config.now();
    debug!(?command, %now, "running command");
    let json = config.output == OutputFormat::Json;

    let out = match command {
        Command::Dashboard => {
            let dashboard = service.dashboard(now);
            if json {
                serde_json::to_string_pretty(&dashboard)?
            } else {
                render(|out| render_dashboard(out, &dashboard))?
            }
        }
        Command::Analytics => {
            let analytics = service.analytics(now);
            if json {
                serde_json::to_string_pretty(&analytics)?
            } else {
                render(|out| render_analytics(out, &analytics))?
            }
        }
        Command::Habits => {
            let habits = service.habits_overview(now);
            if json {
                serde_json::to_string_pretty(&habits)?
            } else {
                render(|out| render_habits(out, &habits))?
            }
        }
        Command::Heatmap { week_offset } => {
            let heatmap = service.heatmap(now, week_offset);
            if json {
                serde_json::to_string_pretty(&heatmap.cells().collect::<Vec<_>>())?
            } else {
                render(|out| render_heatmap(out, &heatmap))?
            }
        }
        Command::ToggleTask { id } => {
            ensure_persistent(&config)?;
            let done = service.toggle_task(&id)?;
            format!("{id}: {}", if done { "done" } else { "pending" })
        }
        Command::ToggleHabit { habit_id, date } => {
            ensure_persistent(&config)?;
            let date = date.unwrap_or_else(|| now.date());
            let done = service.toggle_habit(&habit_id, date)?;
            format!(
                "{habit_id} on {}: {}",
                format_date_key(date),
                if done { "done" } else { "pending" }
            )
        }
    };
    Ok(out)
}

fn render(write: impl FnOnce(&mut String) -> fmt::Result) -> Result<String> {
    let mut out = String::new();
    write(&mut out)?;
    Ok(out)
}

fn ensure_persistent(config: &AppConfig) -> Result<()> {
    if config.progress_path.is_none() {
        bail!("STUDY_PROGRESS must be set to record check-offs");
    }
    Ok(())
}

pub fn render_dashboard(out: &mut impl Write, dashboard: &DashboardSnapshot) -> fmt::Result {
    writeln!(out, "Now: {}", dashboard.now.format("%Y-%m-%d %H:%M"))?;
    match &dashboard.next_task {
        Some(next) => writeln!(
            out,
            "Next: {} {} {} - {}",
            next.starts_at.format("%Y-%m-%d"),
            next.task.start,
            next.task.subject,
            next.task.task
        )?,
        None => writeln!(out, "Next: nothing scheduled")?,
    }
    writeln!(
        out,
        "Today: {:.1}/{:.1} h ({}%)",
        dashboard.today.completed_hours, dashboard.today.total_hours, dashboard.today.percentage
    )?;
    writeln!(
        out,
        "This week: {}/{} h ({}%)",
        dashboard.current_week.completed_hours,
        dashboard.current_week.total_hours,
        dashboard.current_week.percentage
    )?;
    writeln!(
        out,
        "Habits today: {}/{} ({}%)",
        dashboard.today_habits.completed, dashboard.today_habits.total, dashboard.today_habits.percentage
    )?;
    for upcoming in &dashboard.upcoming_exams {
        writeln!(
            out,
            "Exam: {} [{}] in {}d {}h {}m",
            upcoming.exam.name,
            upcoming.exam.subject,
            upcoming.countdown.days,
            upcoming.countdown.hours,
            upcoming.countdown.minutes
        )?;
    }
    Ok(())
}

pub fn render_analytics(out: &mut impl Write, analytics: &AnalyticsSnapshot) -> fmt::Result {
    writeln!(
        out,
        "Overall: {:.1}/{:.1} h ({}%)",
        analytics.horizon.completed_hours, analytics.horizon.total_hours, analytics.horizon.percentage
    )?;
    for summary in &analytics.subjects {
        writeln!(
            out,
            "{}: {:.1}/{:.1} h ({}%)",
            summary.subject, summary.stats.completed_hours, summary.stats.total_hours, summary.stats.percentage
        )?;
    }
    for (idx, hours) in analytics.weekly_progress.iter().enumerate() {
        writeln!(out, "S{}: {:.1} h", idx + 1, hours)?;
    }
    for stat in &analytics.habits_this_week {
        writeln!(out, "{}: {}/7", stat.habit.name, stat.completed_this_week)?;
    }
    writeln!(
        out,
        "Habit consistency: {}/{} ({}%)",
        analytics.habit_consistency.completed,
        analytics.habit_consistency.total,
        analytics.habit_consistency.percentage
    )
}

pub fn render_habits(out: &mut impl Write, habits: &[HabitOverview]) -> fmt::Result {
    for overview in habits {
        writeln!(
            out,
            "[{}] {} {}{}: streak {} (best {}), {}/{} days",
            if overview.done_today { "x" } else { " " },
            overview.habit.icon,
            overview.habit.name,
            if overview.habit.critical { " !" } else { "" },
            overview.streaks.current,
            overview.streaks.best,
            overview.horizon.completed_days,
            overview.horizon.total_days
        )?;
    }
    Ok(())
}

pub fn render_heatmap(out: &mut impl Write, heatmap: &Heatmap) -> fmt::Result {
    let max = heatmap.max();
    // Monday first, matching the calendar week.
    for weekday in [1, 2, 3, 4, 5, 6, 0] {
        write!(out, "{:<4}", day_name(weekday))?;
        for hour in 0..24 {
            let cell = match heatmap.get(weekday, hour) / max {
                v if v <= 0.0 => '.',
                v if v < 0.34 => '-',
                v if v < 0.67 => '+',
                _ => '#',
            };
            out.write_char(cell)?;
        }
        out.write_char('\n')?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn parse(args: &[&str]) -> std::result::Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("study").chain(args.iter().copied())).map(Cli::command)
    }

    #[test]
    fn reads_config_from_variables() {
        let config = AppConfig::from_lookup(lookup(&[
            ("STUDY_CONFIG", "/tmp/config.json"),
            ("STUDY_NOW", "2025-10-23T11:00"),
            ("STUDY_LOOKAHEAD_DAYS", "3"),
            ("STUDY_OUTPUT", "JSON"),
            ("STUDY_EXTRA_EXCLUDED_SUBJECTS", "Cine, ,Termo (Cursada)"),
        ]))
        .unwrap();
        assert_eq!(config.config_path, Some(PathBuf::from("/tmp/config.json")));
        assert_eq!(
            config.now(),
            NaiveDate::from_ymd_opt(2025, 10, 23)
                .unwrap()
                .and_hms_opt(11, 0, 0)
                .unwrap()
        );
        assert_eq!(config.lookahead_days, 3);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.extra_excluded_subjects, ["Cine", "Termo (Cursada)"]);
        let filter = config.subject_filter();
        assert!(!filter.is_subject("Termo (Cursada)"));
        assert!(!filter.is_subject("Gym"));
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("STUDY_NOW", "yesterday"),
            ("STUDY_LOOKAHEAD_DAYS", "0"),
            ("STUDY_OUTPUT", "yaml"),
        ]))
        .unwrap();
        assert!(config.now.is_none());
        assert_eq!(config.lookahead_days, NEXT_TASK_LOOKAHEAD_DAYS);
        assert_eq!(config.output, OutputFormat::Text);
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse(&[]).unwrap(), Command::Dashboard);
        assert_eq!(parse(&["analytics"]).unwrap(), Command::Analytics);
        assert_eq!(parse(&["heatmap"]).unwrap(), Command::Heatmap { week_offset: 0 });
        assert_eq!(
            parse(&["heatmap", "-1"]).unwrap(),
            Command::Heatmap { week_offset: -1 }
        );
        assert_eq!(
            parse(&["toggle-task", "2025-10-22-1"]).unwrap(),
            Command::ToggleTask {
                id: TaskId::new("2025-10-22", 1)
            }
        );
        assert_eq!(
            parse(&["toggle-habit", "water2L", "2025-10-22"]).unwrap(),
            Command::ToggleHabit {
                habit_id: "water2L".into(),
                date: NaiveDate::from_ymd_opt(2025, 10, 22),
            }
        );
        assert_eq!(
            parse(&["toggle-habit", "water2L"]).unwrap(),
            Command::ToggleHabit {
                habit_id: "water2L".into(),
                date: None,
            }
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse(&["toggle-task"]).is_err());
        assert!(parse(&["toggle-task", "2025-10-22"]).is_err());
        assert!(parse(&["toggle-habit", "water2L", "22/10/2025"]).is_err());
        assert!(parse(&["heatmap", "next"]).is_err());
        assert!(parse(&["dance"]).is_err());
        assert!(parse(&["habits", "extra"]).is_err());
    }

    #[test]
    fn heatmap_renders_monday_first() {
        let mut out = String::new();
        render_heatmap(&mut out, &Heatmap::default()).unwrap();
        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows.len(), 7);
        assert!(rows[0].starts_with("Lun"));
        assert!(rows[6].starts_with("Dom"));
        assert!(rows.iter().all(|row| row.ends_with(&".".repeat(24))));
    }

    #[test]
    fn toggles_require_a_progress_file() {
        let config = AppConfig {
            now: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(9, 0, 0),
            ..AppConfig::default()
        };
        let err = run(
            config,
            Command::ToggleTask {
                id: TaskId::new("2025-01-01", 0),
            },
        ).unwrap_err();
        assert!(err.to_string().contains("STUDY_PROGRESS"));
    }

    #[test]
    fn empty_dashboard_renders() {
        let config = AppConfig {
            now: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(9, 0, 0),
            ..AppConfig::default()
        };
        let text = run(config, Command::Dashboard).unwrap();
        assert!(text.contains("Next: nothing scheduled"));
        assert!(text.contains("This week: 0.0/0.0 h (0%)"));
    }
}
