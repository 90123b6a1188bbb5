//! SQLite storage for session records

use std::path::Path;

use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use tracing::info;

use super::{ExerciseSession, SessionStore, TIMESTAMP_FORMAT};

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// In-memory database, gone when dropped
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                name TEXT NOT NULL,
                exercise TEXT NOT NULL,
                reps_or_seconds INTEGER NOT NULL,
                calories REAL NOT NULL DEFAULT 0,
                duration_s INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Number of stored sessions
    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl SessionStore for Database {
    fn append(&self, session: &ExerciseSession) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (timestamp, name, exercise, reps_or_seconds, calories, duration_s) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                session.name,
                session.exercise.name(),
                session.reps_or_seconds,
                session.calories,
                session.duration_s,
            ],
        )?;
        info!(
            "Saved {} session (id {})",
            session.exercise,
            self.conn.last_insert_rowid()
        );
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ExerciseSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, name, exercise, reps_or_seconds, calories, duration_s FROM sessions ORDER BY id ASC"
        )?;

        let sessions = stmt.query_map([], |row| {
            let timestamp: String = row.get(0)?;
            let exercise: String = row.get(2)?;
            Ok(ExerciseSession {
                timestamp: NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
                name: row.get(1)?,
                exercise: exercise
                    .parse()
                    .map_err(|e: anyhow::Error| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?,
                reps_or_seconds: row.get(3)?,
                calories: row.get(4)?,
                duration_s: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::create_session;
    use crate::exercises::Exercise;
    use tempfile::tempdir;

    #[test]
    fn test_empty_database() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_all().unwrap().is_empty());
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_append_and_load_in_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        // Later timestamps first: order must follow insertion, not date
        let sessions = vec![
            create_session(Exercise::Plank, 60, 9),
            create_session(Exercise::PushUps, 15, 2),
            create_session(Exercise::Squats, 25, 5),
        ];
        for s in &sessions {
            db.append(s).unwrap();
        }

        assert_eq!(db.count().unwrap(), 3);
        assert_eq!(db.load_all().unwrap(), sessions);
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("repcoach.db");
        {
            let db = Database::open(&path).unwrap();
            db.append(&create_session(Exercise::BicepCurls, 12, 1)).unwrap();
        }
        let db = Database::open(&path).unwrap();
        let sessions = db.load_all().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].exercise, Exercise::BicepCurls);
    }
}
