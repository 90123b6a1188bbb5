//! Database module - append-only storage for completed sessions
//!
//! Two backends share one record schema: the CSV session log (the default,
//! readable by spreadsheet tools) and SQLite.

mod csv_log;
mod sqlite;

pub use csv_log::CsvLog;
pub use sqlite::Database;

use anyhow::Result;
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::exercises::Exercise;

/// Column set of the session table, in file order
pub const SESSION_COLUMNS: [&str; 6] = [
    "timestamp",
    "name",
    "exercise",
    "reps_or_seconds",
    "calories",
    "duration_s",
];

/// Timestamp layout used in every stored record
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Calories per rep (or per plank second), applied when reading history
pub const CALORIES_PER_UNIT: f64 = 0.5;

/// Completed session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSession {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub name: String,
    pub exercise: Exercise,
    /// Reps, or held seconds for plank
    pub reps_or_seconds: u32,
    /// Always written as 0, see `estimated_calories`
    pub calories: f64,
    pub duration_s: u32,
}

impl ExerciseSession {
    /// Record for a session finished at `timestamp`
    pub fn completed(
        name: impl Into<String>,
        exercise: Exercise,
        reps_or_seconds: u32,
        duration_s: u32,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            timestamp,
            name: name.into(),
            exercise,
            reps_or_seconds,
            calories: 0.0,
            duration_s,
        }
    }

    /// Record for a session finished now (local time, whole seconds)
    pub fn completed_now(
        name: impl Into<String>,
        exercise: Exercise,
        reps_or_seconds: u32,
        duration_s: u32,
    ) -> Self {
        let now = Local::now().naive_local();
        let now = now.with_nanosecond(0).unwrap_or(now);
        Self::completed(name, exercise, reps_or_seconds, duration_s, now)
    }

    /// Calories derived from volume; the stored field stays 0
    pub fn estimated_calories(&self) -> f64 {
        self.reps_or_seconds as f64 * CALORIES_PER_UNIT
    }
}

/// Append-only session log
pub trait SessionStore {
    /// Append one record; earlier records are never touched
    fn append(&self, session: &ExerciseSession) -> Result<()>;

    /// All records in insertion order; an absent store reads as empty
    fn load_all(&self) -> Result<Vec<ExerciseSession>>;
}

impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    fn append(&self, session: &ExerciseSession) -> Result<()> {
        (**self).append(session)
    }

    fn load_all(&self) -> Result<Vec<ExerciseSession>> {
        (**self).load_all()
    }
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
