//! Configuration - detector thresholds and persisted user settings

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default directory for the session log, database and settings
pub const DEFAULT_DATA_DIR: &str = "data";
pub const SESSIONS_CSV: &str = "workout_sessions.csv";
pub const SESSIONS_DB: &str = "repcoach.db";
pub const SETTINGS_FILE: &str = "settings.json";

/// Two-threshold angle machine (push-ups, squats, curls)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleProfile {
    /// Metric above this flips to the extended stage
    pub open_above: f64,
    /// Metric below this (from the extended stage) counts a rep
    pub close_below: f64,
    /// EMA factor for the metric, `None` = raw metric
    pub smoothing: Option<f64>,
    pub debounce_secs: f64,
}

impl AngleProfile {
    pub fn debounce(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_secs.max(0.0))
    }
}

/// Limb-spread machine (jumping jacks); ratios are relative to hip width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadProfile {
    pub close_hands_below: f64,
    pub close_legs_below: f64,
    pub open_hands_above: f64,
    pub open_legs_above: f64,
    /// Hip widths at or below this are considered degenerate
    pub min_hip_width: f64,
    /// Substituted for a degenerate hip width
    pub fallback_hip_width: f64,
    pub debounce_secs: f64,
}

impl SpreadProfile {
    pub fn debounce(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_secs.max(0.0))
    }
}

/// Hold machine (plank)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldProfile {
    /// Body line angle that counts as a straight plank
    pub min_body_angle: f64,
    /// Feedback fires each time the hold passes a multiple of this
    pub milestone_secs: u32,
}

/// Everything the rep detector needs besides the frames themselves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub push_ups: AngleProfile,
    pub squats: AngleProfile,
    pub bicep_curls: AngleProfile,
    pub jumping_jacks: SpreadProfile,
    pub plank: HoldProfile,
    pub beep_enabled: bool,
    pub voice_enabled: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            push_ups: AngleProfile {
                open_above: 160.0,
                close_below: 95.0,
                smoothing: Some(0.45),
                debounce_secs: 0.8,
            },
            squats: AngleProfile {
                open_above: 160.0,
                close_below: 95.0,
                smoothing: None,
                debounce_secs: 0.8,
            },
            bicep_curls: AngleProfile {
                open_above: 160.0,
                close_below: 45.0,
                smoothing: Some(0.45),
                debounce_secs: 0.8,
            },
            jumping_jacks: SpreadProfile {
                close_hands_below: 1.05,
                close_legs_below: 1.0,
                open_hands_above: 1.6,
                open_legs_above: 1.2,
                min_hip_width: 1e-6,
                fallback_hip_width: 0.25,
                debounce_secs: 0.6,
            },
            plank: HoldProfile {
                min_body_angle: 140.0,
                milestone_secs: 10,
            },
            beep_enabled: true,
            voice_enabled: false,
        }
    }
}

impl DetectorConfig {
    /// Config for a tracking session. Thresholds come from `path`, with
    /// missing keys kept at their defaults (all defaults when `None`).
    /// Beep and voice switches come from `settings` unless the file sets
    /// them itself.
    pub fn for_session(path: Option<&Path>, settings: &Settings) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default().with_feedback(settings.beep_enabled, settings.voice_enabled));
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading detector config {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing detector config {}", path.display()))?;
        let has_key = |key: &str| value.get(key).is_some();
        let (beep_set, voice_set) = (has_key("beep_enabled"), has_key("voice_enabled"));

        let mut config: Self = serde_json::from_value(value)
            .with_context(|| format!("parsing detector config {}", path.display()))?;
        if !beep_set {
            config.beep_enabled = settings.beep_enabled;
        }
        if !voice_set {
            config.voice_enabled = settings.voice_enabled;
        }
        info!(
            "Detector config {} (beep: {}, voice: {})",
            path.display(),
            config.beep_enabled,
            config.voice_enabled
        );
        Ok(config)
    }

    pub fn with_feedback(mut self, beep: bool, voice: bool) -> Self {
        self.beep_enabled = beep;
        self.voice_enabled = voice;
        self
    }
}

/// User settings, persisted between runs as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Passed to the external pose estimator
    pub camera_index: u32,
    pub beep_enabled: bool,
    pub voice_enabled: bool,
    /// Name written into session records
    pub user_name: String,
    /// Target used when `track` gets no explicit one
    pub default_target: u32,
    /// Pause between frames in the tracking loop
    pub frame_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            beep_enabled: true,
            voice_enabled: false,
            user_name: "User".to_string(),
            default_target: 12,
            frame_interval_ms: 20,
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Paths inside the data directory
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub dir: PathBuf,
}

impl DataPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sessions_csv(&self) -> PathBuf {
        self.dir.join(SESSIONS_CSV)
    }

    pub fn sessions_db(&self) -> PathBuf {
        self.dir.join(SESSIONS_DB)
    }

    pub fn settings(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }
}
