//! Frame sources - where landmark frames come from
//!
//! Every source speaks the same line format, one JSON value per frame:
//!
//! - `null`: nobody in view
//! - `{"left_shoulder": [x, y], ...}`: named joints
//! - `[[x, y], ...]`: the 33-entry MediaPipe landmark array
//! - `{"t": 1.25, "landmarks": <any of the above>}`: same, captured
//!   1.25 s after the session started

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::exercises::Exercise;
use crate::pose::{Joint, LandmarkFrame, Point};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Frame source unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to read frame: {0}")]
    Read(#[from] io::Error),
    #[error("Malformed frame on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// What the pose estimator saw in one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Frame(LandmarkFrame),
    Nothing,
}

impl Capture {
    pub fn frame(&self) -> Option<&LandmarkFrame> {
        match self {
            Capture::Frame(frame) => Some(frame),
            Capture::Nothing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub capture: Capture,
    /// Time since session start; `None` = use the wall clock
    pub offset: Option<Duration>,
}

pub trait FrameSource {
    /// Acquire the underlying device or file
    fn open(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Next frame, or `None` once the stream has ended
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, SourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self) -> Result<(), SourceError> {
        (**self).open()
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, SourceError> {
        (**self).next_frame()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireLandmarks {
    Indexed(Vec<[f64; 2]>),
    Named(HashMap<String, [f64; 2]>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireLine {
    Stamped {
        t: f64,
        landmarks: Option<WireLandmarks>,
    },
    Bare(Option<WireLandmarks>),
}

fn to_capture(landmarks: Option<WireLandmarks>) -> Capture {
    match landmarks {
        None => Capture::Nothing,
        Some(WireLandmarks::Indexed(points)) => Capture::Frame(LandmarkFrame::from_mediapipe(&points)),
        Some(WireLandmarks::Named(points)) => Capture::Frame(LandmarkFrame::from_joints(
            points.into_iter().filter_map(|(name, xy)| match Joint::from_name(&name) {
                Some(joint) => Some((joint, Point::from(xy))),
                None => {
                    debug!("Ignoring untracked landmark {}", name);
                    None
                }
            }),
        )),
    }
}

/// Parse one line of the frame format
pub fn parse_frame_line(text: &str) -> Result<CapturedFrame, serde_json::Error> {
    let captured = match serde_json::from_str::<WireLine>(text)? {
        WireLine::Stamped { t, landmarks } => CapturedFrame {
            capture: to_capture(landmarks),
            offset: Duration::try_from_secs_f64(t).ok(),
        },
        WireLine::Bare(landmarks) => CapturedFrame {
            capture: to_capture(landmarks),
            offset: None,
        },
    };
    Ok(captured)
}

/// Line-by-line reader shared by the file and process sources
struct LineReader {
    reader: Box<dyn BufRead>,
    line_no: usize,
    buf: String,
}

impl LineReader {
    fn new(reader: Box<dyn BufRead>) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, SourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return parse_frame_line(text)
                .map(Some)
                .map_err(|source| SourceError::Parse {
                    line: self.line_no,
                    source,
                });
        }
    }
}

/// Replays a recorded JSON-lines landmark log
pub struct JsonLinesSource {
    path: Option<PathBuf>,
    lines: Option<LineReader>,
}

impl JsonLinesSource {
    /// File source; the file is opened by `open()`
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            lines: None,
        }
    }

    /// Source over any reader, already open
    pub fn from_reader<R: BufRead + 'static>(reader: R) -> Self {
        Self {
            path: None,
            lines: Some(LineReader::new(Box::new(reader))),
        }
    }
}

impl FrameSource for JsonLinesSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.lines.is_some() {
            return Ok(());
        }
        let Some(path) = &self.path else {
            return Err(SourceError::Unavailable("no input".to_string()));
        };
        let file = File::open(path)
            .map_err(|e| SourceError::Unavailable(format!("{}: {}", path.display(), e)))?;
        info!("Replaying landmarks from {}", path.display());
        self.lines = Some(LineReader::new(Box::new(BufReader::new(file))));
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, SourceError> {
        match self.lines.as_mut() {
            Some(lines) => lines.next_frame(),
            None => Err(SourceError::Unavailable("source not opened".to_string())),
        }
    }
}

/// Placeholder replaced by the camera index in command arguments
pub const CAMERA_PLACEHOLDER: &str = "{camera}";

/// Runs an external pose estimator and reads frames from its stdout
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    camera_index: u32,
    child: Option<Child>,
    lines: Option<LineReader>,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, camera_index: u32) -> Self {
        Self {
            program: program.into(),
            args,
            camera_index,
            child: None,
            lines: None,
        }
    }

    /// Arguments with the camera placeholder filled in
    pub fn resolved_args(&self) -> Vec<String> {
        let camera = self.camera_index.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace(CAMERA_PLACEHOLDER, &camera))
            .collect()
    }
}

impl FrameSource for CommandSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.child.is_some() {
            return Ok(());
        }
        let args = self.resolved_args();
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| SourceError::Unavailable(format!("{}: {}", self.program, e)))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(SourceError::Unavailable(format!("{}: no stdout", self.program)));
        };

        info!("Started pose process {} {:?}", self.program, args);
        self.lines = Some(LineReader::new(Box::new(BufReader::new(stdout))));
        self.child = Some(child);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, SourceError> {
        match self.lines.as_mut() {
            Some(lines) => lines.next_frame(),
            None => Err(SourceError::Unavailable("pose process not started".to_string())),
        }
    }
}

impl Drop for CommandSource {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("Stopped pose process {}", self.program);
        }
    }
}

const SYNTHETIC_PERIOD_SECS: u32 = 2;

/// Seeded generator of noisy exercise motion.
///
/// Rep exercises cycle through top, descent, bottom and ascent once every
/// two seconds. Plank holds a straight body line for `cycles` seconds.
pub struct SyntheticSource {
    exercise: Exercise,
    rng: StdRng,
    cycles: u32,
    fps: u32,
    noise: f64,
    dropout: f64,
    frame_index: u32,
}

impl SyntheticSource {
    pub fn new(exercise: Exercise, seed: u64) -> Self {
        Self {
            exercise,
            rng: StdRng::seed_from_u64(seed),
            cycles: 5,
            fps: 10,
            noise: 2.0,
            dropout: 0.0,
            frame_index: 0,
        }
    }

    /// Rep cycles to generate, or hold seconds for plank
    pub fn cycles(mut self, cycles: u32) -> Self {
        self.cycles = cycles;
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    /// Uniform angle jitter in degrees
    pub fn noise(mut self, degrees: f64) -> Self {
        self.noise = degrees.abs();
        self
    }

    /// Chance of a frame with nobody in view
    pub fn dropout(mut self, probability: f64) -> Self {
        self.dropout = probability.clamp(0.0, 1.0);
        self
    }

    pub fn total_frames(&self) -> u32 {
        if self.exercise.is_timed() {
            self.cycles * self.fps + 1
        } else {
            self.cycles * SYNTHETIC_PERIOD_SECS * self.fps
        }
    }

    fn jitter(&mut self) -> f64 {
        if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        }
    }

    /// Position within the current rep cycle, in [0, 1)
    fn phase(&self) -> f64 {
        let period = SYNTHETIC_PERIOD_SECS * self.fps;
        (self.frame_index % period) as f64 / period as f64
    }

    fn pose(&mut self) -> LandmarkFrame {
        let phase = self.phase();
        match self.exercise {
            Exercise::PushUps => {
                let elbow = cycle_angle(phase, 170.0, 70.0) + self.jitter();
                figure(elbow, 175.0)
            }
            Exercise::BicepCurls => {
                let elbow = cycle_angle(phase, 170.0, 25.0) + self.jitter();
                figure(elbow, 175.0)
            }
            Exercise::Squats => {
                let knee = cycle_angle(phase, 172.0, 70.0) + self.jitter();
                figure(175.0, knee)
            }
            Exercise::JumpingJacks => {
                let (hands, legs) = if phase < 0.5 { (0.5, 0.6) } else { (2.5, 2.0) };
                let scale = 1.0 + self.jitter() / 100.0;
                jack(hands * scale, legs * scale)
            }
            Exercise::Plank => {
                let body = (175.0 + self.jitter()).min(180.0);
                plank(body)
            }
        }
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, SourceError> {
        if self.frame_index >= self.total_frames() {
            return Ok(None);
        }

        let offset = Duration::from_millis(self.frame_index as u64 * 1000 / self.fps as u64);
        let capture = if self.dropout > 0.0 && self.rng.gen_bool(self.dropout) {
            Capture::Nothing
        } else {
            Capture::Frame(self.pose())
        };
        self.frame_index += 1;

        Ok(Some(CapturedFrame {
            capture,
            offset: Some(offset),
        }))
    }
}

/// Joint angle over one cycle: hold open, descend, hold closed, ascend
fn cycle_angle(phase: f64, open: f64, closed: f64) -> f64 {
    let span = open - closed;
    match phase {
        p if p < 0.25 => open,
        p if p < 0.5 => open - span * (p - 0.25) / 0.25,
        p if p < 0.75 => closed,
        p => closed + span * (p - 0.75) / 0.25,
    }
}

/// Point `len` away from `b` such that the angle a-b-result is `degrees`
fn bend(a: Point, b: Point, degrees: f64, len: f64) -> Point {
    let base = (a.y - b.y).atan2(a.x - b.x);
    let theta = base + degrees.clamp(0.0, 180.0).to_radians();
    Point::new(b.x + len * theta.cos(), b.y + len * theta.sin())
}

/// Standing figure with the given elbow and knee angles
fn figure(elbow: f64, knee: f64) -> LandmarkFrame {
    let mut joints = Vec::with_capacity(12);
    for (side, x) in [(0usize, 0.4), (1usize, 0.6)] {
        let [shoulder, elbow_j, wrist, hip, knee_j, ankle] = SIDES[side];
        let sh = Point::new(x, 0.3);
        let el = Point::new(x, 0.45);
        let hp = Point::new(x, 0.55);
        let kn = Point::new(x, 0.75);
        joints.extend([
            (shoulder, sh),
            (elbow_j, el),
            (wrist, bend(sh, el, elbow, 0.15)),
            (hip, hp),
            (knee_j, kn),
            (ankle, bend(hp, kn, knee, 0.2)),
        ]);
    }
    LandmarkFrame::from_joints(joints)
}

/// Jumping-jack pose; spreads are in hip widths
fn jack(hands: f64, legs: f64) -> LandmarkFrame {
    let hip_width = 0.1;
    let (cx, hands_y, ankles_y) = (0.5, 0.15, 0.95);
    let hand_half = hands * hip_width / 2.0;
    let leg_half = legs * hip_width / 2.0;
    LandmarkFrame::from_joints([
        (Joint::LeftShoulder, Point::new(cx - 0.08, 0.3)),
        (Joint::RightShoulder, Point::new(cx + 0.08, 0.3)),
        (Joint::LeftElbow, Point::new(cx - 0.1, 0.25)),
        (Joint::RightElbow, Point::new(cx + 0.1, 0.25)),
        (Joint::LeftWrist, Point::new(cx - hand_half, hands_y)),
        (Joint::RightWrist, Point::new(cx + hand_half, hands_y)),
        (Joint::LeftHip, Point::new(cx - hip_width / 2.0, 0.55)),
        (Joint::RightHip, Point::new(cx + hip_width / 2.0, 0.55)),
        (Joint::LeftKnee, Point::new(cx - leg_half * 0.6, 0.75)),
        (Joint::RightKnee, Point::new(cx + leg_half * 0.6, 0.75)),
        (Joint::LeftAnkle, Point::new(cx - leg_half, ankles_y)),
        (Joint::RightAnkle, Point::new(cx + leg_half, ankles_y)),
    ])
}

/// Side-on plank with the given shoulder-hip-ankle angle
fn plank(body: f64) -> LandmarkFrame {
    let mut joints = Vec::with_capacity(12);
    for (side, y) in [(0usize, 0.5), (1usize, 0.52)] {
        let [shoulder, elbow, wrist, hip, knee, ankle] = SIDES[side];
        let sh = Point::new(0.25, y);
        let hp = Point::new(0.5, y);
        let an = bend(sh, hp, body, 0.3);
        joints.extend([
            (shoulder, sh),
            (elbow, Point::new(0.25, y + 0.12)),
            (wrist, Point::new(0.3, y + 0.12)),
            (hip, hp),
            (knee, hp.midpoint(an)),
            (ankle, an),
        ]);
    }
    LandmarkFrame::from_joints(joints)
}

const SIDES: [[Joint; 6]; 2] = [
    [
        Joint::LeftShoulder,
        Joint::LeftElbow,
        Joint::LeftWrist,
        Joint::LeftHip,
        Joint::LeftKnee,
        Joint::LeftAnkle,
    ],
    [
        Joint::RightShoulder,
        Joint::RightElbow,
        Joint::RightWrist,
        Joint::RightHip,
        Joint::RightKnee,
        Joint::RightAnkle,
    ],
];
