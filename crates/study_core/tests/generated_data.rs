use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use study_core::{
    model::{StudyConfig, TaskId},
    service::StudyService,
    subjects::SubjectFilter,
};
use tempfile::tempdir;

const CONFIG: &str = r#"{
    "exams": [
        { "name": "Termo Primera fecha", "date": "2025-12-01T12:00:00", "subject": "Termodinámica", "priority": 1 },
        { "name": "Electro Primera fecha", "date": "2025-12-03T15:00:00", "subject": "Electrotecnia", "priority": 2 },
        { "name": "Racional Parcial", "date": "2025-10-01T10:00:00", "subject": "Mecánica Racional", "priority": 1 }
    ],
    "habits": [
        { "id": "sleep23", "name": "Dormir 23:00", "icon": "bed", "critical": true },
        { "id": "water2L", "name": "2L agua", "icon": "drop", "critical": false }
    ],
    "scheduleByDate": {
        "2025-10-22": [
            { "start": "08:00", "end": "10:00", "subject": "Mecánica Racional", "task": "Inicio módulo", "hours": 2 },
            { "start": "10:30", "end": "12:00", "subject": "Termodinámica", "task": "Conceptos base", "hours": 1.5 },
            { "start": "13:30", "end": "16:30", "subject": "Electrotecnia", "task": "Repaso módulo anterior", "hours": 3 }
        ],
        "2025-10-23": [
            { "start": "08:00", "end": "10:00", "subject": "Estructuras III", "task": "Introducción", "hours": 2 },
            { "start": "13:30", "end": "16:00", "subject": "Termodinámica", "task": "Ejercicios", "hours": 2.5 },
            { "start": "18:00", "end": "20:00", "subject": "Básquet", "task": "Entrenamiento", "hours": 2 }
        ],
        "2025-10-27": [
            { "start": "16:00", "end": "20:00", "subject": "Termo (Cursada)", "task": "Clase teórica", "hours": 4 },
            { "start": "20:00", "end": "20:30", "subject": "Cena", "task": "Cenar", "hours": 0.5 }
        ],
        "2025-11-03": [
            { "start": "09:00", "end": "12:00", "subject": "PARCIAL Termodinámica", "task": "Examen", "hours": 3 }
        ]
    }
}"#;

const PROGRESS: &str = r#"{
    "completedTasks": {
        "2025-10-22-0": true,
        "2025-10-22-1": true,
        "2025-10-22-2": false,
        "2025-10-23-1": true
    },
    "completedHabits": {
        "2025-10-22": { "sleep23": true, "water2L": true },
        "2025-10-23": { "sleep23": true },
        "2025-10-24": { "sleep23": false, "water2L": true },
        "2025-10-25": { "sleep23": true, "water2L": true }
    }
}"#;

fn write_file(path: &PathBuf, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write fixture");
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

#[test]
fn dashboard_analytics_and_toggles_round_trip() {
    let temp = tempdir().expect("tempdir");
    let config_path = temp.path().join("coach-config.json");
    let progress_path = temp.path().join("state").join("progress.json");
    write_file(&config_path, CONFIG);
    write_file(&progress_path, PROGRESS);

    let service = StudyService::builder()
        .config_path(&config_path)
        .progress_path(&progress_path)
        .build()
        .expect("build study service");

    assert_eq!(
        service.subjects(),
        [
            "Mecánica Racional",
            "Termodinámica",
            "Electrotecnia",
            "Estructuras III",
            "Termo (Cursada)"
        ]
    );

    // Thursday 2025-10-23, 11:00
    let now = at(2025, 10, 23, 11, 0);
    let dashboard = service.dashboard(now);
    let next = dashboard.next_task.expect("next task");
    assert_eq!(next.id, TaskId::new("2025-10-23", 1));
    assert_eq!(next.task.subject, "Termodinámica");
    assert_eq!(dashboard.today.total_hours, 6.5);
    assert_eq!(dashboard.today.completed_hours, 2.5);
    assert_eq!(dashboard.current_week.total_hours, "13.0");
    assert_eq!(dashboard.current_week.completed_hours, "6.0");
    assert_eq!(dashboard.current_week.percentage, 46);
    assert_eq!(dashboard.today_habits.completed, 1);
    assert_eq!(dashboard.today_habits.total, 2);
    assert_eq!(dashboard.today_habits.percentage, 50);
    let exams: Vec<&str> = dashboard
        .upcoming_exams
        .iter()
        .map(|u| u.exam.name.as_str())
        .collect();
    assert_eq!(exams, ["Termo Primera fecha", "Electro Primera fecha"]);

    let analytics = service.analytics(now);
    assert_eq!(analytics.total_weeks, 2);
    assert_eq!(analytics.weekly_progress, vec![6.0, 0.0]);
    let termo = analytics
        .subjects
        .iter()
        .find(|s| s.subject == "Termodinámica")
        .expect("termo stats");
    assert_eq!(termo.stats.total_hours, 4.0);
    assert_eq!(termo.stats.completed_hours, 4.0);
    assert_eq!(termo.stats.percentage, 100);
    assert_eq!(analytics.habit_consistency.completed, 6);
    assert_eq!(analytics.habit_consistency.total, 14);

    // Saturday 2025-10-25: sleep23 done 25, missed 24 -> current 1, best 2.
    let habits = service.habits_overview(at(2025, 10, 25, 8, 0));
    let sleep = habits.iter().find(|h| h.habit.id == "sleep23").unwrap();
    assert!(sleep.done_today);
    assert_eq!(sleep.streaks.current, 1);
    assert_eq!(sleep.streaks.best, 2);
    let water = habits.iter().find(|h| h.habit.id == "water2L").unwrap();
    assert_eq!(water.streaks.current, 2);
    assert_eq!(water.horizon.total_days, 13);
    assert_eq!(water.horizon.completed_days, 3);

    let heatmap = service.heatmap(now, 0);
    // Wednesday 08:00-10:00 and 10:30-12:00, Thursday 13:30-16:00
    assert_eq!(heatmap.get(3, 8), 1.0);
    assert_eq!(heatmap.get(3, 10), 0.5);
    assert_eq!(heatmap.get(4, 13), 0.5);
    assert!(service.heatmap(now, 1).is_empty());

    assert!(service
        .toggle_task(&TaskId::new("2025-10-22", 2))
        .expect("toggle task"));
    assert!(!service
        .toggle_habit("sleep23", NaiveDate::from_ymd_opt(2025, 10, 23).unwrap())
        .expect("toggle habit"));

    let reloaded = StudyService::builder()
        .config_path(&config_path)
        .progress_path(&progress_path)
        .build()
        .expect("reload");
    let progress = reloaded.progress();
    assert!(progress
        .completed_tasks
        .is_completed(&TaskId::new("2025-10-22", 2)));
    assert!(!progress
        .completed_habits
        .is_completed(NaiveDate::from_ymd_opt(2025, 10, 23).unwrap(), "sleep23"));
    assert_eq!(reloaded.dashboard(now).current_week.completed_hours, "9.0");
}

#[test]
fn empty_service_degrades_to_zeroes() {
    let service = StudyService::builder().build().expect("empty service");
    let now = at(2025, 1, 1, 9, 0);
    let dashboard = service.dashboard(now);
    assert!(dashboard.next_task.is_none());
    assert_eq!(dashboard.current_week.total_hours, "0.0");
    assert_eq!(dashboard.current_week.percentage, 0);
    assert_eq!(dashboard.today_habits.percentage, 0);

    let analytics = service.analytics(now);
    assert_eq!(analytics.total_weeks, 0);
    assert!(analytics.weekly_progress.is_empty());
    assert!(analytics.subjects.is_empty());
    assert!(service.habits_overview(now).is_empty());
}

#[test]
fn replacing_config_keeps_positional_progress() {
    let config: StudyConfig = serde_json::from_str(CONFIG).expect("fixture config");
    let service = StudyService::builder()
        .with_config(config.clone())
        .with_subject_filter(SubjectFilter::allow_all())
        .build()
        .expect("service");
    assert!(service.subjects().contains(&"Cena".to_string()));
    service
        .toggle_task(&TaskId::new("2025-10-27", 0))
        .expect("toggle");

    let mut swapped = config;
    let day = swapped
        .schedule_by_date
        .get_mut("2025-10-27")
        .expect("day exists");
    day.reverse();
    service.replace_config(swapped).expect("replace");

    let now = at(2025, 10, 27, 7, 0);
    // The id now points at the dinner slot, not the class.
    assert_eq!(service.dashboard(now).today.completed_hours, 0.5);
}
