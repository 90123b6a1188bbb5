//! Recommendation engine based on session history trends

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use super::plan::{PlanEntry, build_mini_plan};
use super::trend::trend_slope;
use crate::db::ExerciseSession;
use crate::exercises::Exercise;

/// Slope (per training day) beyond which an exercise counts as moving
pub const TREND_THRESHOLD: f64 = 0.2;
pub const BUMP_IMPROVING: f64 = 1.10;
pub const BUMP_STEADY: f64 = 1.06;
pub const BUMP_DECLINING: f64 = 1.03;
/// Sessions this close to the latest one count as recent
pub const RECENT_WINDOW_DAYS: i64 = 21;

pub const NOTE_NO_DATA: &str = "No data yet. Do a few workouts to unlock recommendations.";
pub const NOTE_GENERATED: &str = "Auto-generated from your last sessions (local).";

/// Everything computed for one exercise
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseInsight {
    pub exercise: Exercise,
    pub avg: f64,
    pub med: f64,
    pub total: u64,
    pub sessions: usize,
    /// Least-squares slope of the daily means
    pub trend: f64,
    pub next_target: u32,
    /// Sessions inside the recent window (informational)
    pub recent_sessions: usize,
}

/// Recommendation computed from a non-empty history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationBundle {
    /// One entry per exercise, in grouping order (by exercise name)
    pub insights: Vec<ExerciseInsight>,
    pub weakest: Exercise,
    pub strongest: Exercise,
    pub mini_plan: Vec<PlanEntry>,
    pub note: String,
    /// Narrative sentences, one per line
    pub summary: Vec<String>,
}

impl RecommendationBundle {
    pub fn insight(&self, exercise: Exercise) -> Option<&ExerciseInsight> {
        self.insights.iter().find(|i| i.exercise == exercise)
    }

    pub fn next_target(&self, exercise: Exercise) -> Option<u32> {
        self.insight(exercise).map(|i| i.next_target)
    }

    pub fn improving(&self) -> Vec<Exercise> {
        self.insights
            .iter()
            .filter(|i| i.trend > TREND_THRESHOLD)
            .map(|i| i.exercise)
            .collect()
    }

    pub fn declining(&self) -> Vec<Exercise> {
        self.insights
            .iter()
            .filter(|i| i.trend < -TREND_THRESHOLD)
            .map(|i| i.exercise)
            .collect()
    }

    pub fn summary_text(&self) -> String {
        self.summary.join("\n")
    }
}

/// Result of `recommend`: a bare note when there is nothing to analyse
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recommendation {
    NoData { note: String },
    Ready(RecommendationBundle),
}

impl Recommendation {
    pub fn note(&self) -> &str {
        match self {
            Recommendation::NoData { note } => note,
            Recommendation::Ready(bundle) => &bundle.note,
        }
    }

    pub fn bundle(&self) -> Option<&RecommendationBundle> {
        match self {
            Recommendation::NoData { .. } => None,
            Recommendation::Ready(bundle) => Some(bundle),
        }
    }
}

/// Target multiplier for a trend slope
pub fn bump_for(trend: f64) -> f64 {
    if trend > TREND_THRESHOLD {
        BUMP_IMPROVING
    } else if trend < -TREND_THRESHOLD {
        BUMP_DECLINING
    } else {
        BUMP_STEADY
    }
}

/// Next-session target: average bumped by trend, rounded half-to-even, at least 1
pub fn next_target(avg: f64, trend: f64) -> u32 {
    let suggested = (avg * bump_for(trend)).round_ties_even();
    if suggested.is_finite() && suggested >= 1.0 {
        suggested.min(u32::MAX as f64) as u32
    } else {
        1
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Recommendation engine over the full session history
pub struct Recommender {
    sessions: Vec<ExerciseSession>,
}

impl Recommender {
    pub fn new(sessions: Vec<ExerciseSession>) -> Self {
        Self { sessions }
    }

    /// Recommend with the plan starting today (local date)
    pub fn recommend(&self) -> Recommendation {
        self.recommend_on(Local::now().date_naive())
    }

    /// Recommend with the plan starting on `today`
    pub fn recommend_on(&self, today: NaiveDate) -> Recommendation {
        let Some(latest) = self.sessions.iter().map(|s| s.timestamp).max() else {
            return Recommendation::NoData {
                note: NOTE_NO_DATA.to_string(),
            };
        };
        let recent_cutoff = latest - Duration::days(RECENT_WINDOW_DAYS);

        let insights: Vec<ExerciseInsight> = self
            .grouping_order()
            .into_iter()
            .map(|exercise| {
                let of_exercise: Vec<&ExerciseSession> = self
                    .sessions
                    .iter()
                    .filter(|s| s.exercise == exercise)
                    .collect();

                let mut values: Vec<f64> = of_exercise.iter().map(|s| s.reps_or_seconds as f64).collect();
                let total: u64 = of_exercise.iter().map(|s| s.reps_or_seconds as u64).sum();
                let sessions = of_exercise.len();
                let avg = total as f64 / sessions as f64;
                let med = median(&mut values);
                let trend = trend_slope(of_exercise.iter().copied());
                let recent_sessions = of_exercise
                    .iter()
                    .filter(|s| s.timestamp >= recent_cutoff)
                    .count();

                debug!("{}: avg {:.1}, trend {:+.2}", exercise, avg, trend);

                ExerciseInsight {
                    exercise,
                    avg,
                    med,
                    total,
                    sessions,
                    trend,
                    next_target: next_target(avg, trend),
                    recent_sessions,
                }
            })
            .collect();

        // Stable ascending sort by average: ties keep grouping order
        let mut by_avg: Vec<&ExerciseInsight> = insights.iter().collect();
        by_avg.sort_by(|a, b| a.avg.total_cmp(&b.avg));
        let weakest = by_avg[0].exercise;
        let strongest = by_avg[by_avg.len() - 1].exercise;

        let others: Vec<Exercise> = insights
            .iter()
            .map(|i| i.exercise)
            .filter(|e| *e != weakest)
            .collect();

        let mini_plan = build_mini_plan(today, weakest, &others, Some(strongest), |ex| {
            insights.iter().find(|i| i.exercise == ex).map(|i| i.next_target)
        });

        let mut bundle = RecommendationBundle {
            insights,
            weakest,
            strongest,
            mini_plan,
            note: NOTE_GENERATED.to_string(),
            summary: Vec::new(),
        };
        bundle.summary = summarize(&bundle);

        info!(
            "Recommendation over {} sessions: weakest {}, strongest {}",
            self.sessions.len(),
            weakest,
            strongest
        );
        Recommendation::Ready(bundle)
    }

    /// Exercises present in history, ordered by name
    fn grouping_order(&self) -> Vec<Exercise> {
        let mut exercises: Vec<Exercise> = Vec::new();
        for session in &self.sessions {
            if !exercises.contains(&session.exercise) {
                exercises.push(session.exercise);
            }
        }
        exercises.sort_by_key(|e| e.name());
        exercises
    }
}

/// Free-function form of `Recommender::recommend_on`
pub fn recommend(history: &[ExerciseSession], today: NaiveDate) -> Recommendation {
    Recommender::new(history.to_vec()).recommend_on(today)
}

fn summarize(bundle: &RecommendationBundle) -> Vec<String> {
    let avg_of = |ex: Exercise| bundle.insight(ex).map(|i| i.avg).unwrap_or(0.0);
    let names = |list: Vec<Exercise>| list.iter().map(|e| e.name()).collect::<Vec<_>>().join(", ");

    let mut lines = vec![
        format!(
            "Your weakest exercise is **{}** (avg {:.1}).",
            bundle.weakest,
            avg_of(bundle.weakest)
        ),
        format!(
            "Your strongest exercise is **{}** (avg {:.1}).",
            bundle.strongest,
            avg_of(bundle.strongest)
        ),
    ];

    let improving = bundle.improving();
    if !improving.is_empty() {
        lines.push(format!("Improving recently at: {}.", names(improving)));
    }
    let declining = bundle.declining();
    if !declining.is_empty() {
        lines.push(format!("Needs attention (declining): {}.", names(declining)));
    }
    lines.push("Next session targets provided below. Aim for consistent form, not speed.".to_string());

    lines
}
