//! End-to-end: tracked sessions land in the store and drive recommendations

use std::sync::atomic::AtomicBool;

use chrono::NaiveDate;
use tempfile::TempDir;

use repcoach::config::DetectorConfig;
use repcoach::db::{CsvLog, Database, ExerciseSession, SessionStore};
use repcoach::exercises::Exercise;
use repcoach::ml::plan::export_plan;
use repcoach::ml::{Analytics, Recommendation, recommend};
use repcoach::session::{Feedback, SessionOutcome, SessionRunner, SessionUpdate};
use repcoach::source::SyntheticSource;

struct Silent;

impl Feedback for Silent {
    fn show(&mut self, _update: &SessionUpdate<'_>) {}
    fn beep(&mut self) {}
    fn speak(&mut self, _count: u32) {}
}

fn create_past_session(exercise: Exercise, reps: u32, day: u32) -> ExerciseSession {
    let timestamp = NaiveDate::from_ymd_opt(2025, 1, day)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap();
    ExerciseSession::completed("User", exercise, reps, reps * 3, timestamp)
}

fn track(store: &dyn SessionStore, exercise: Exercise, target: u32, seed: u64) -> ExerciseSession {
    let mut source = SyntheticSource::new(exercise, seed).cycles(target + 2);
    let running = AtomicBool::new(true);
    let runner = SessionRunner::new(exercise, target, DetectorConfig::default());
    match runner.run(&mut source, store, &mut Silent, &running).unwrap() {
        SessionOutcome::Completed(session) => session,
        other => panic!("Expected completion, got {:?}", other),
    }
}

#[test]
fn test_tracked_sessions_feed_recommendations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("workout_sessions.csv");

    {
        let store = CsvLog::new(&path);
        store.append(&create_past_session(Exercise::Squats, 6, 1)).unwrap();
        store.append(&create_past_session(Exercise::Squats, 8, 2)).unwrap();
        assert_eq!(track(&store, Exercise::Squats, 10, 3).reps_or_seconds, 10);
        assert_eq!(track(&store, Exercise::PushUps, 4, 5).reps_or_seconds, 4);
    }

    // Fresh handle, as after a restart
    let history = CsvLog::new(&path).load_all().unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(|s| s.calories == 0.0));

    let analytics = Analytics::new(history.clone());
    assert_eq!(analytics.total_volume(), 28);
    assert_eq!(analytics.total_calories(), 14);

    let today = NaiveDate::from_ymd_opt(2030, 6, 3).unwrap();
    let Recommendation::Ready(bundle) = recommend(&history, today) else {
        panic!("Expected a recommendation");
    };

    assert_eq!(bundle.weakest, Exercise::PushUps);
    assert_eq!(bundle.strongest, Exercise::Squats);
    // Squats: 6, 8, 10 over three days is improving; 8 * 1.10 rounds to 9
    assert!(bundle.improving().contains(&Exercise::Squats));
    assert_eq!(bundle.next_target(Exercise::Squats), Some(9));
    // Push-ups: one day, steady; 4 * 1.06 rounds to 4
    assert_eq!(bundle.next_target(Exercise::PushUps), Some(4));

    let plan: Vec<_> = bundle
        .mini_plan
        .iter()
        .map(|e| (e.date.format("%m-%d").to_string(), e.exercise, e.target))
        .collect();
    assert_eq!(
        plan,
        vec![
            ("06-03".to_string(), Exercise::PushUps, 4),
            ("06-05".to_string(), Exercise::Squats, 9),
            ("06-07".to_string(), Exercise::Squats, 9),
        ]
    );

    let plan_path = dir.path().join("plan.csv");
    export_plan(&bundle.mini_plan, &plan_path).unwrap();
    let text = std::fs::read_to_string(&plan_path).unwrap();
    assert!(text.starts_with("date,exercise,target,note\n2030-06-03,Push-ups,4,"));
}

#[test]
fn test_plank_session_into_sqlite() {
    let db = Database::open_in_memory().unwrap();
    let session = track(&db, Exercise::Plank, 5, 1);
    assert_eq!(session.reps_or_seconds, 5);

    let loaded = db.load_all().unwrap();
    assert_eq!(loaded, vec![session]);
    assert_eq!(loaded[0].estimated_calories(), 2.5);
}

#[test]
fn test_empty_history_has_no_recommendation() {
    let dir = TempDir::new().unwrap();
    let history = CsvLog::new(dir.path().join("missing.csv")).load_all().unwrap();
    let result = recommend(&history, NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
    assert!(result.bundle().is_none());
    assert!(result.note().starts_with("No data yet"));
}
