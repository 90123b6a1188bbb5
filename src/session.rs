//! Session runner - drives one tracked workout from first frame to saved record

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::{DetectorConfig, Settings};
use crate::db::{ExerciseSession, SessionStore};
use crate::detector::{FrameOutcome, RepDetector};
use crate::exercises::Exercise;
use crate::source::{FrameSource, SourceError};

/// Snapshot handed to the presentation layer after every frame
#[derive(Debug, Clone, Copy)]
pub struct SessionUpdate<'a> {
    pub exercise: Exercise,
    pub target: u32,
    pub outcome: &'a FrameOutcome,
    pub elapsed: Duration,
}

/// User-facing output of a running session
pub trait Feedback {
    fn show(&mut self, update: &SessionUpdate<'_>);
    fn beep(&mut self);
    fn speak(&mut self, count: u32);
}

/// Prints status lines to stdout; the beep is the terminal bell
#[derive(Debug, Default)]
pub struct ConsoleFeedback {
    last_status: String,
}

impl Feedback for ConsoleFeedback {
    fn show(&mut self, update: &SessionUpdate<'_>) {
        // Only print when something changed
        if update.outcome.status == self.last_status {
            return;
        }
        self.last_status.clone_from(&update.outcome.status);
        println!(
            "[{:>5.1}s] {:<14} {}/{} {} (metric {})",
            update.elapsed.as_secs_f64(),
            update.outcome.status,
            update.outcome.counter,
            update.target,
            update.exercise.unit(),
            update.outcome.metric,
        );
    }

    fn beep(&mut self) {
        print!("\x07");
        let _ = io::stdout().flush();
    }

    fn speak(&mut self, count: u32) {
        info!("Voice: {}", count);
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Target reached; the record was saved
    Completed(ExerciseSession),
    /// Cancelled through the running flag
    Stopped { counter: u32 },
    /// The source ran out of frames
    SourceEnded { counter: u32 },
    /// The source could not be opened or dropped out
    SourceUnavailable(String),
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed(_))
    }
}

pub struct SessionRunner {
    exercise: Exercise,
    target: u32,
    config: DetectorConfig,
    user_name: String,
    frame_interval: Option<Duration>,
}

impl SessionRunner {
    /// Runner for `target` reps (or seconds for plank); a zero target
    /// is raised to one
    pub fn new(exercise: Exercise, target: u32, config: DetectorConfig) -> Self {
        Self {
            exercise,
            target: target.max(1),
            config,
            user_name: "User".to_string(),
            frame_interval: None,
        }
    }

    /// Take user name and pacing from the settings. Feedback switches
    /// stay with the detector config, see [`DetectorConfig::for_session`]
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.user_name.clone_from(&settings.user_name);
        self.frame_interval = Some(settings.frame_interval()).filter(|d| !d.is_zero());
        self
    }

    pub fn user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }

    /// Sleep this long between frames
    pub fn frame_interval(mut self, interval: Option<Duration>) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn exercise(&self) -> Exercise {
        self.exercise
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    fn goal_met(&self, detector: &RepDetector) -> bool {
        if self.exercise.is_timed() {
            detector.counter() >= self.target
        } else {
            detector.state().target_reached(self.exercise, self.target)
        }
    }

    /// Run until the target is reached, the source ends or `running` is
    /// cleared. Only a completed session is written to `store`.
    pub fn run<S, T, F>(
        &self,
        source: &mut S,
        store: &T,
        feedback: &mut F,
        running: &AtomicBool,
    ) -> Result<SessionOutcome>
    where
        S: FrameSource + ?Sized,
        T: SessionStore + ?Sized,
        F: Feedback + ?Sized,
    {
        if let Err(err) = source.open() {
            warn!("Cannot start {} session: {}", self.exercise, err);
            return Ok(SessionOutcome::SourceUnavailable(err.to_string()));
        }

        let started = Instant::now();
        let mut detector = RepDetector::new(self.exercise, self.config.clone(), started);
        info!(
            "Starting {} session, target {} {}",
            self.exercise,
            self.target,
            self.exercise.unit()
        );

        loop {
            if !running.load(Ordering::SeqCst) {
                info!("{} session stopped at {}", self.exercise, detector.counter());
                return Ok(SessionOutcome::Stopped {
                    counter: detector.counter(),
                });
            }

            let captured = match source.next_frame() {
                Ok(Some(captured)) => captured,
                Ok(None) => {
                    info!("Frame source ended at {}", detector.counter());
                    return Ok(SessionOutcome::SourceEnded {
                        counter: detector.counter(),
                    });
                }
                Err(SourceError::Parse { line, source }) => {
                    warn!("Skipping malformed frame on line {}: {}", line, source);
                    continue;
                }
                Err(SourceError::Unavailable(reason)) => {
                    warn!("Frame source unavailable: {}", reason);
                    return Ok(SessionOutcome::SourceUnavailable(reason));
                }
                Err(SourceError::Read(err)) => {
                    warn!("Frame not received: {}", err);
                    return Ok(SessionOutcome::SourceEnded {
                        counter: detector.counter(),
                    });
                }
            };

            let now = captured
                .offset
                .map(|offset| started + offset)
                .unwrap_or_else(Instant::now);
            let outcome = detector.process(captured.capture.frame(), now);

            feedback.show(&SessionUpdate {
                exercise: self.exercise,
                target: self.target,
                outcome: &outcome,
                elapsed: detector.state().elapsed(now),
            });
            if outcome.beep {
                feedback.beep();
            }
            if outcome.voice {
                feedback.speak(outcome.counter);
            }

            if self.goal_met(&detector) {
                let duration = u32::try_from(detector.state().elapsed(now).as_secs()).unwrap_or(u32::MAX);
                let session = ExerciseSession::completed_now(
                    self.user_name.clone(),
                    self.exercise,
                    detector.counter(),
                    duration,
                );
                store.append(&session)?;
                info!(
                    "{} session complete: {} {} in {}s",
                    self.exercise,
                    session.reps_or_seconds,
                    self.exercise.unit(),
                    duration
                );
                return Ok(SessionOutcome::Completed(session));
            }

            if let Some(interval) = self.frame_interval {
                debug!("Pacing {:?}", interval);
                thread::sleep(interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CsvLog;
    use crate::source::{JsonLinesSource, SyntheticSource};
    use std::io::Cursor;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingFeedback {
        statuses: Vec<String>,
        beeps: u32,
        spoken: Vec<u32>,
    }

    impl Feedback for RecordingFeedback {
        fn show(&mut self, update: &SessionUpdate<'_>) {
            self.statuses.push(update.outcome.status.clone());
        }

        fn beep(&mut self) {
            self.beeps += 1;
        }

        fn speak(&mut self, count: u32) {
            self.spoken.push(count);
        }
    }

    fn create_store() -> (TempDir, CsvLog) {
        let dir = TempDir::new().unwrap();
        let store = CsvLog::new(dir.path().join("sessions.csv"));
        (dir, store)
    }

    #[test]
    fn test_completed_session_is_saved() {
        let (_dir, store) = create_store();
        let mut source = SyntheticSource::new(Exercise::PushUps, 11).cycles(5).noise(0.0);
        let mut feedback = RecordingFeedback::default();
        let running = AtomicBool::new(true);

        let runner = SessionRunner::new(Exercise::PushUps, 3, DetectorConfig::default()).user_name("Ann");
        let outcome = runner.run(&mut source, &store, &mut feedback, &running).unwrap();

        let SessionOutcome::Completed(session) = outcome else {
            panic!("Expected completion, got {:?}", outcome);
        };
        assert_eq!(session.reps_or_seconds, 3);
        assert_eq!(session.name, "Ann");
        assert_eq!(session.calories, 0.0);
        // Third rep lands about five seconds in
        assert!(session.duration_s >= 4 && session.duration_s <= 6, "duration: {}", session.duration_s);
        assert_eq!(feedback.beeps, 3);
        assert!(feedback.spoken.is_empty());

        let saved = store.load_all().unwrap();
        assert_eq!(saved, vec![session]);
    }

    #[test]
    fn test_noisy_squats_count_every_cycle() {
        let (_dir, store) = create_store();
        let mut source = SyntheticSource::new(Exercise::Squats, 99).cycles(4);
        let running = AtomicBool::new(true);

        let runner = SessionRunner::new(Exercise::Squats, 50, DetectorConfig::default());
        let outcome = runner
            .run(&mut source, &store, &mut RecordingFeedback::default(), &running)
            .unwrap();

        assert_eq!(outcome, SessionOutcome::SourceEnded { counter: 4 });
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_jumping_jacks_with_voice() {
        let (_dir, store) = create_store();
        let mut source = SyntheticSource::new(Exercise::JumpingJacks, 4).cycles(3);
        let mut feedback = RecordingFeedback::default();
        let running = AtomicBool::new(true);

        let config = DetectorConfig::default().with_feedback(false, true);
        let runner = SessionRunner::new(Exercise::JumpingJacks, 3, config);
        let outcome = runner.run(&mut source, &store, &mut feedback, &running).unwrap();

        assert!(outcome.is_completed());
        assert_eq!(feedback.beeps, 0);
        assert_eq!(feedback.spoken, vec![1, 2, 3]);
    }

    #[test]
    fn test_plank_completes_on_held_seconds() {
        let (_dir, store) = create_store();
        let mut source = SyntheticSource::new(Exercise::Plank, 8).cycles(15);
        let mut feedback = RecordingFeedback::default();
        let running = AtomicBool::new(true);

        let runner = SessionRunner::new(Exercise::Plank, 12, DetectorConfig::default());
        let outcome = runner.run(&mut source, &store, &mut feedback, &running).unwrap();

        let SessionOutcome::Completed(session) = outcome else {
            panic!("Expected completion, got {:?}", outcome);
        };
        assert_eq!(session.reps_or_seconds, 12);
        assert_eq!(session.duration_s, 12);
        // One milestone at 10 s
        assert_eq!(feedback.beeps, 1);
        assert_eq!(feedback.statuses.last().map(String::as_str), Some("Plank: 12s"));
    }

    #[test]
    fn test_cleared_flag_stops_before_first_frame() {
        let (_dir, store) = create_store();
        let mut source = SyntheticSource::new(Exercise::Squats, 1);
        let mut feedback = RecordingFeedback::default();
        let running = AtomicBool::new(false);

        let runner = SessionRunner::new(Exercise::Squats, 5, DetectorConfig::default());
        let outcome = runner.run(&mut source, &store, &mut feedback, &running).unwrap();

        assert_eq!(outcome, SessionOutcome::Stopped { counter: 0 });
        assert!(feedback.statuses.is_empty());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_missing_source_is_reported() {
        let (_dir, store) = create_store();
        let mut source = JsonLinesSource::from_path("/nonexistent/frames.jsonl");
        let running = AtomicBool::new(true);

        let runner = SessionRunner::new(Exercise::PushUps, 5, DetectorConfig::default());
        let outcome = runner
            .run(&mut source, &store, &mut RecordingFeedback::default(), &running)
            .unwrap();

        assert!(matches!(outcome, SessionOutcome::SourceUnavailable(_)));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (_dir, store) = create_store();
        let input = "null\n{oops\nnull\n";
        let mut source = JsonLinesSource::from_reader(Cursor::new(input));
        let mut feedback = RecordingFeedback::default();
        let running = AtomicBool::new(true);

        let runner = SessionRunner::new(Exercise::Squats, 5, DetectorConfig::default());
        let outcome = runner.run(&mut source, &store, &mut feedback, &running).unwrap();

        assert_eq!(outcome, SessionOutcome::SourceEnded { counter: 0 });
        assert_eq!(feedback.statuses, vec!["No person", "No person"]);
    }

    #[test]
    fn test_untracked_joints_report_no_landmarks() {
        let (_dir, store) = create_store();
        let input = r#"{"nose": [0.5, 0.1], "left_hip": [0.4, 0.5]}"#;
        let mut source = JsonLinesSource::from_reader(Cursor::new(input));
        let mut feedback = RecordingFeedback::default();
        let running = AtomicBool::new(true);

        let runner = SessionRunner::new(Exercise::Squats, 5, DetectorConfig::default());
        let outcome = runner.run(&mut source, &store, &mut feedback, &running).unwrap();

        assert_eq!(outcome, SessionOutcome::SourceEnded { counter: 0 });
        assert_eq!(feedback.statuses, vec!["No landmarks"]);
    }

    #[test]
    fn test_zero_target_raised_to_one() {
        let runner = SessionRunner::new(Exercise::Squats, 0, DetectorConfig::default());
        assert_eq!(runner.target(), 1);
    }

    #[test]
    fn test_with_settings() {
        let settings = Settings {
            user_name: "Kim".to_string(),
            frame_interval_ms: 0,
            ..Settings::default()
        };
        let runner = SessionRunner::new(Exercise::Plank, 30, DetectorConfig::default()).with_settings(&settings);
        assert_eq!(runner.user_name, "Kim");
        assert_eq!(runner.frame_interval, None);
    }

    #[test]
    fn test_settings_keep_config_feedback_switches() {
        let (_dir, store) = create_store();
        let mut source = SyntheticSource::new(Exercise::JumpingJacks, 4).cycles(3);
        let mut feedback = RecordingFeedback::default();
        let running = AtomicBool::new(true);

        let settings = Settings {
            frame_interval_ms: 0,
            ..Settings::default()
        };
        assert!(settings.beep_enabled && !settings.voice_enabled);
        let config = DetectorConfig::default().with_feedback(false, true);
        let runner = SessionRunner::new(Exercise::JumpingJacks, 3, config).with_settings(&settings);
        let outcome = runner.run(&mut source, &store, &mut feedback, &running).unwrap();

        assert!(outcome.is_completed());
        assert_eq!(feedback.beeps, 0);
        assert_eq!(feedback.spoken, vec![1, 2, 3]);
    }
}
