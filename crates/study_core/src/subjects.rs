use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::Schedule;

/// Labels that appear in the schedule but are not academic subjects.
pub const DEFAULT_EXCLUDED_SUBJECTS: &[&str] = &[
    "Repaso",
    "Descanso",
    "Básquet",
    "Gym",
    "Cena",
    "Repaso Semanal",
    "Repaso General",
];

/// Any label containing one of these is an exam marker, not a subject.
pub const DEFAULT_EXCLUDED_MARKERS: &[&str] = &["PARCIAL"];

/// Policy deciding which schedule labels count as subjects for statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectFilter {
    pub excluded: BTreeSet<String>,
    pub excluded_markers: Vec<String>,
}

impl Default for SubjectFilter {
    fn default() -> Self {
        Self {
            excluded: DEFAULT_EXCLUDED_SUBJECTS
                .iter()
                .map(|label| label.to_string())
                .collect(),
            excluded_markers: DEFAULT_EXCLUDED_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }
}

impl SubjectFilter {
    /// Keeps every label.
    pub fn allow_all() -> Self {
        Self {
            excluded: BTreeSet::new(),
            excluded_markers: Vec::new(),
        }
    }

    pub fn exclude(mut self, label: impl Into<String>) -> Self {
        self.excluded.insert(label.into());
        self
    }

    pub fn exclude_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        if !self.excluded_markers.contains(&marker) {
            self.excluded_markers.push(marker);
        }
        self
    }

    pub fn is_subject(&self, label: &str) -> bool {
        !self.excluded.contains(label)
            && !self
                .excluded_markers
                .iter()
                .any(|marker| label.contains(marker.as_str()))
    }

    /// Distinct subjects in order of first appearance, walking days in date order.
    pub fn subjects(&self, schedule: &Schedule) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut subjects = Vec::new();
        for task in schedule.values().flatten() {
            if self.is_subject(&task.subject) && seen.insert(task.subject.as_str()) {
                subjects.push(task.subject.clone());
            }
        }
        subjects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScheduleTask;

    fn task(subject: &str) -> ScheduleTask {
        ScheduleTask {
            start: "08:00".into(),
            end: "09:00".into(),
            subject: subject.into(),
            task: String::new(),
            hours: 1.0,
        }
    }

    #[test]
    fn default_policy_drops_events_and_exam_markers() {
        let mut schedule = Schedule::new();
        schedule.insert(
            "2025-10-23".into(),
            vec![task("Termodinámica"), task("Gym"), task("Termo (Cursada)")],
        );
        schedule.insert(
            "2025-10-22".into(),
            vec![task("Mecánica Racional"), task("Cena"), task("Termodinámica")],
        );
        schedule.insert(
            "2025-11-03".into(),
            vec![task("PARCIAL Termo"), task("Repaso Semanal"), task("Repaso (extra)")],
        );

        let subjects = SubjectFilter::default().subjects(&schedule);
        assert_eq!(
            subjects,
            [
                "Mecánica Racional",
                "Termodinámica",
                "Termo (Cursada)",
                "Repaso (extra)"
            ]
        );
    }

    #[test]
    fn filter_is_configurable() {
        let filter = SubjectFilter::allow_all().exclude("Termodinámica").exclude_marker("Cursada");
        assert!(!filter.is_subject("Termodinámica"));
        assert!(!filter.is_subject("Termo (Cursada)"));
        assert!(filter.is_subject("Gym"));
    }
}
