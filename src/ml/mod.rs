//! ML module - History analytics and recommendations
//!
//! Features:
//! - Dashboard totals and per-exercise distribution
//! - Trend per exercise using linear regression (linfa)
//! - Next-session targets and a 7-day mini plan

pub mod plan;
pub mod recommender;
pub mod trend;

pub use plan::PlanEntry;
pub use recommender::{Recommendation, RecommendationBundle, Recommender, recommend};

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;

use crate::db::ExerciseSession;
use crate::exercises::Exercise;

/// Which sessions a history view shows
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Empty = all exercises
    pub exercises: Vec<Exercise>,
    /// Inclusive bounds on the session date
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl HistoryFilter {
    pub fn matches(&self, session: &ExerciseSession) -> bool {
        let date = session.timestamp.date();
        (self.exercises.is_empty() || self.exercises.contains(&session.exercise))
            && self.from.is_none_or(|from| date >= from)
            && self.to.is_none_or(|to| date <= to)
    }
}

/// Session analytics
pub struct Analytics {
    sessions: Vec<ExerciseSession>,
}

impl Analytics {
    pub fn new(sessions: Vec<ExerciseSession>) -> Self {
        Self { sessions }
    }

    /// Narrow to the sessions matching `filter`
    pub fn filtered(&self, filter: &HistoryFilter) -> Analytics {
        Analytics::new(
            self.sessions
                .iter()
                .filter(|s| filter.matches(s))
                .cloned()
                .collect(),
        )
    }

    pub fn total_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Sum of reps and plank seconds
    pub fn total_volume(&self) -> u64 {
        self.sessions.iter().map(|s| s.reps_or_seconds as u64).sum()
    }

    /// Estimated calories, truncated to whole units
    pub fn total_calories(&self) -> u64 {
        self.sessions.iter().map(|s| s.estimated_calories()).sum::<f64>() as u64
    }

    /// Totals line printed above the history table
    pub fn summary(&self) -> String {
        let duration = self.total_duration_secs();
        format!(
            "Sessions: {} | Reps/seconds: {} | Duration: {}m {:02}s",
            self.total_sessions(),
            self.total_volume(),
            duration / 60,
            duration % 60
        )
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.sessions.iter().map(|s| s.duration_s as u64).sum()
    }

    /// Total volume per exercise, ordered by exercise name
    pub fn volume_by_exercise(&self) -> Vec<(Exercise, u64)> {
        let mut by_exercise: BTreeMap<&'static str, (Exercise, u64)> = BTreeMap::new();
        for s in &self.sessions {
            by_exercise.entry(s.exercise.name()).or_insert((s.exercise, 0)).1 += s.reps_or_seconds as u64;
        }
        by_exercise.into_values().collect()
    }

    /// Average volume per session, per exercise, ordered by exercise name
    pub fn average_by_exercise(&self) -> Vec<(Exercise, f64)> {
        self.volume_by_exercise()
            .into_iter()
            .map(|(exercise, total)| {
                let n = self.sessions.iter().filter(|s| s.exercise == exercise).count();
                (exercise, total as f64 / n as f64)
            })
            .collect()
    }

    /// Total volume per calendar day, oldest first
    pub fn daily_totals(&self) -> Vec<(NaiveDate, u64)> {
        let mut days: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for s in &self.sessions {
            *days.entry(s.timestamp.date()).or_insert(0) += s.reps_or_seconds as u64;
        }
        days.into_iter().collect()
    }

    /// Sessions sorted newest first
    pub fn newest_first(&self) -> Vec<&ExerciseSession> {
        let mut sorted: Vec<&ExerciseSession> = self.sessions.iter().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted
    }

    /// Get training frequency (sessions per week)
    pub fn weekly_frequency(&self) -> f64 {
        let Some(first) = self.sessions.iter().map(|s| s.timestamp.date()).min() else {
            return 0.0;
        };
        let Some(last) = self.sessions.iter().map(|s| s.timestamp.date()).max() else {
            return 0.0;
        };
        if self.sessions.len() < 2 {
            return 0.0;
        }

        let days = (last - first).num_days() as f64;
        if days == 0.0 {
            return self.sessions.len() as f64;
        }

        (self.sessions.len() as f64 / days) * 7.0
    }

    /// Write the sessions (newest first) in the session-log CSV layout
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for session in self.newest_first() {
            csv_writer.serialize(session)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
