//! Rep detector - per-exercise state machines over landmark frames
//!
//! Each frame yields a form metric (an angle or a spread ratio). The metric is
//! compared against an "open" and a "closed" threshold to flip the stage, and
//! a rep is counted on one specific stage transition, at most once per
//! debounce window. Plank is a hold: its counter is the elapsed time while the
//! body line is straight.
//!
//! Nothing here fails: frames without a person, or with joints missing, only
//! change the status text and leave the state exactly as it was.

pub mod metrics;

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::config::{AngleProfile, DetectorConfig, HoldProfile, SpreadProfile};
use crate::exercises::Exercise;
use crate::pose::LandmarkFrame;

/// Status when the pose source saw nobody
pub const STATUS_NO_PERSON: &str = "No person";
/// Status when a person was seen but joints the exercise needs are missing
pub const STATUS_NO_LANDMARKS: &str = "No landmarks";
/// Status while the plank body line is broken
pub const STATUS_FIX_PLANK: &str = "Fix plank";
/// Status when a frame moved no threshold
pub const STATUS_TRACKING: &str = "Tracking";

/// Phase within one motion cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Up,
    Down,
    Open,
    Close,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Up => "up",
            Stage::Down => "down",
            Stage::Open => "open",
            Stage::Close => "close",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mutable detection state for one session
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorState {
    pub stage: Stage,
    /// Reps so far, or elapsed hold seconds for plank
    pub counter: u32,
    /// EMA of the metric; `None` until the first valid frame
    pub smoothed: Option<f64>,
    pub last_rep_at: Option<Instant>,
    pub started_at: Instant,
}

impl DetectorState {
    /// Fresh state: counter at zero, stage seeded "up"
    pub fn new(started_at: Instant) -> Self {
        Self {
            stage: Stage::Up,
            counter: 0,
            smoothed: None,
            last_rep_at: None,
            started_at,
        }
    }

    /// Whether a rep exercise has hit its goal. Plank completion is left to
    /// the caller, which compares the elapsed-seconds counter itself.
    pub fn target_reached(&self, exercise: Exercise, target: u32) -> bool {
        !exercise.is_timed() && self.counter >= target
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    fn debounce_passed(&self, now: Instant, window: Duration) -> bool {
        match self.last_rep_at {
            Some(last) => now.saturating_duration_since(last) > window,
            None => true,
        }
    }

    fn smooth(&mut self, raw: f64, alpha: Option<f64>) -> f64 {
        let value = match (alpha, self.smoothed) {
            (Some(alpha), Some(prev)) => alpha * raw + (1.0 - alpha) * prev,
            _ => raw,
        };
        if alpha.is_some() {
            self.smoothed = Some(value);
        }
        value
    }

    fn accept_rep(&mut self, now: Instant, next: Stage) {
        self.counter += 1;
        self.last_rep_at = Some(now);
        self.stage = next;
    }
}

/// What one frame produced, for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutcome {
    pub status: String,
    /// Integer form metric, 0 when not applicable
    pub metric: i32,
    pub counter: u32,
    /// A rep (or plank milestone) was accepted on this frame
    pub milestone: bool,
    pub beep: bool,
    pub voice: bool,
}

impl FrameOutcome {
    fn idle(status: &str, counter: u32) -> Self {
        Self {
            status: status.to_string(),
            metric: 0,
            counter,
            milestone: false,
            beep: false,
            voice: false,
        }
    }
}

/// Advance the state machine by one frame.
///
/// `frame` is `None` when the pose source reported nobody in view.
pub fn process_frame(
    exercise: Exercise,
    frame: Option<&LandmarkFrame>,
    state: &mut DetectorState,
    config: &DetectorConfig,
    now: Instant,
) -> FrameOutcome {
    let Some(frame) = frame else {
        return FrameOutcome::idle(STATUS_NO_PERSON, state.counter);
    };

    let step = match exercise {
        Exercise::PushUps => angle_step(
            metrics::elbow_angle(frame),
            state,
            &config.push_ups,
            now,
            AngleLabels {
                open: Stage::Up,
                closed: Stage::Down,
                open_status: "Up",
                rep_status: "Rep",
            },
        ),
        Exercise::Squats => angle_step(
            metrics::knee_angle(frame),
            state,
            &config.squats,
            now,
            AngleLabels {
                open: Stage::Up,
                closed: Stage::Down,
                open_status: "Stand",
                rep_status: "Squat",
            },
        ),
        Exercise::BicepCurls => angle_step(
            metrics::elbow_angle(frame),
            state,
            &config.bicep_curls,
            now,
            AngleLabels {
                open: Stage::Down,
                closed: Stage::Up,
                open_status: "Down",
                rep_status: "Curl",
            },
        ),
        Exercise::JumpingJacks => spread_step(frame, state, &config.jumping_jacks, now),
        Exercise::Plank => hold_step(frame, state, &config.plank, now),
    };

    match step {
        Some(step) => {
            if step.milestone {
                debug!("{} milestone accepted: {}", exercise, state.counter);
            }
            FrameOutcome {
                status: step.status,
                metric: step.metric,
                counter: state.counter,
                milestone: step.milestone,
                beep: step.milestone && config.beep_enabled,
                voice: step.milestone && config.voice_enabled,
            }
        }
        None => FrameOutcome::idle(STATUS_NO_LANDMARKS, state.counter),
    }
}

struct Step {
    status: String,
    metric: i32,
    milestone: bool,
}

/// Stage names and status words for one angle exercise
struct AngleLabels {
    /// Stage entered above the open threshold
    open: Stage,
    /// Stage entered when a rep is counted
    closed: Stage,
    open_status: &'static str,
    rep_status: &'static str,
}

fn angle_step(
    raw: Option<f64>,
    state: &mut DetectorState,
    profile: &AngleProfile,
    now: Instant,
    labels: AngleLabels,
) -> Option<Step> {
    let value = state.smooth(raw?, profile.smoothing);
    let mut status = STATUS_TRACKING.to_string();
    let mut milestone = false;

    if value > profile.open_above {
        state.stage = labels.open;
        status = labels.open_status.to_string();
    }
    if value < profile.close_below
        && state.stage == labels.open
        && state.debounce_passed(now, profile.debounce())
    {
        state.accept_rep(now, labels.closed);
        status = format!("{} {}", labels.rep_status, state.counter);
        milestone = true;
    }

    Some(Step {
        status,
        metric: value as i32,
        milestone,
    })
}

fn spread_step(
    frame: &LandmarkFrame,
    state: &mut DetectorState,
    profile: &SpreadProfile,
    now: Instant,
) -> Option<Step> {
    let spread = metrics::limb_spread(frame, profile)?;
    let mut status = STATUS_TRACKING.to_string();
    let mut milestone = false;

    if spread.hands < profile.close_hands_below && spread.legs < profile.close_legs_below {
        state.stage = Stage::Close;
        status = "Close".to_string();
    }
    if spread.hands > profile.open_hands_above
        && spread.legs > profile.open_legs_above
        && state.stage == Stage::Close
        && state.debounce_passed(now, profile.debounce())
    {
        state.accept_rep(now, Stage::Open);
        status = format!("Jack {}", state.counter);
        milestone = true;
    }

    Some(Step {
        status,
        metric: (spread.hands * 100.0) as i32,
        milestone,
    })
}

fn hold_step(
    frame: &LandmarkFrame,
    state: &mut DetectorState,
    profile: &HoldProfile,
    now: Instant,
) -> Option<Step> {
    let body = metrics::body_line_angle(frame)?;

    if body <= profile.min_body_angle {
        return Some(Step {
            status: STATUS_FIX_PLANK.to_string(),
            metric: body as i32,
            milestone: false,
        });
    }

    let previous = state.counter;
    let elapsed = u32::try_from(state.elapsed(now).as_secs()).unwrap_or(u32::MAX);
    state.counter = elapsed;

    let every = profile.milestone_secs;
    let milestone = every > 0 && elapsed / every > previous / every;

    Some(Step {
        status: format!("Plank: {}s", elapsed),
        metric: body as i32,
        milestone,
    })
}

/// Convenience wrapper owning the exercise, config and state of one session
#[derive(Debug, Clone)]
pub struct RepDetector {
    exercise: Exercise,
    config: DetectorConfig,
    state: DetectorState,
}

impl RepDetector {
    pub fn new(exercise: Exercise, config: DetectorConfig, started_at: Instant) -> Self {
        Self {
            exercise,
            config,
            state: DetectorState::new(started_at),
        }
    }

    pub fn process(&mut self, frame: Option<&LandmarkFrame>, now: Instant) -> FrameOutcome {
        process_frame(self.exercise, frame, &mut self.state, &self.config, now)
    }

    pub fn exercise(&self) -> Exercise {
        self.exercise
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn counter(&self) -> u32 {
        self.state.counter
    }
}
