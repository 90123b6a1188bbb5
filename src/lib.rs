//! repcoach - Camera-based exercise rep counter with local training history
//!
//! Pose landmarks in, counted reps out; finished sessions feed a trend-based
//! recommender for the next workout.

pub mod config;
pub mod db;
pub mod detector;
pub mod exercises;
pub mod ml;
pub mod pose;
pub mod session;
pub mod source;
pub mod tips;

pub use db::{CsvLog, Database, ExerciseSession, SessionStore};
pub use detector::RepDetector;
pub use exercises::Exercise;
