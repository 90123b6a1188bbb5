//! CSV session log - header on first write, rows appended after

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use tracing::info;

use super::{ExerciseSession, SessionStore};

/// Flat CSV file holding one row per completed session
#[derive(Debug)]
pub struct CsvLog {
    path: PathBuf,
    /// Serializes appends from sessions sharing this log
    write_lock: Mutex<()>,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

impl SessionStore for CsvLog {
    fn append(&self, session: &ExerciseSession) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("session log lock poisoned"))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // Empty file (new or truncated) gets the header
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(session)?;
        writer.flush()?;

        info!(
            "Saved {} session ({} {}) to {}",
            session.exercise,
            session.reps_or_seconds,
            session.exercise.unit(),
            self.path.display()
        );
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ExerciseSession>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let sessions = reader
            .deserialize()
            .collect::<Result<Vec<ExerciseSession>, _>>()?;
        Ok(sessions)
    }
}
