use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::model::Exam;

/// Time left until an exam, each part floored and never negative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpcomingExam {
    pub exam: Exam,
    pub starts_at: NaiveDateTime,
    pub countdown: Countdown,
}

impl Exam {
    /// Wall-clock start of the exam. Offsets in RFC 3339 input are dropped,
    /// keeping the local time as written.
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        let raw = self.date.trim();
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }
}

pub fn exam_countdown(exam: &Exam, now: NaiveDateTime) -> Option<Countdown> {
    let remaining = exam.starts_at()? - now;
    let minutes_total = remaining.num_minutes().max(0);
    Some(Countdown {
        days: minutes_total / (24 * 60),
        hours: (minutes_total / 60) % 24,
        minutes: minutes_total % 60,
    })
}

/// Exams that have not started yet, soonest first. Exams whose date does
/// not parse are left out.
pub fn upcoming_exams(exams: &[Exam], now: NaiveDateTime) -> Vec<UpcomingExam> {
    let mut upcoming: Vec<UpcomingExam> = exams
        .iter()
        .filter_map(|exam| {
            let starts_at = exam.starts_at()?;
            if starts_at <= now {
                return None;
            }
            Some(UpcomingExam {
                exam: exam.clone(),
                starts_at,
                countdown: exam_countdown(exam, now)?,
            })
        })
        .collect();
    upcoming.sort_by(|a, b| {
        a.starts_at
            .cmp(&b.starts_at)
            .then_with(|| a.exam.priority.cmp(&b.exam.priority))
    });
    upcoming
}
