//! Per-exercise trend using linear regression (linfa)

use std::collections::BTreeMap;

use chrono::NaiveDate;
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use tracing::debug;

use crate::db::ExerciseSession;

/// Minimum number of distinct days before a slope means anything
const MIN_DAYS: usize = 2;

/// Mean `reps_or_seconds` per calendar day, oldest day first
pub fn daily_means<'a, I>(sessions: I) -> Vec<(NaiveDate, f64)>
where
    I: IntoIterator<Item = &'a ExerciseSession>,
{
    let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for session in sessions {
        let entry = days.entry(session.timestamp.date()).or_insert((0.0, 0));
        entry.0 += session.reps_or_seconds as f64;
        entry.1 += 1;
    }

    days.into_iter()
        .map(|(day, (sum, n))| (day, sum / n as f64))
        .collect()
}

/// Least-squares line through `(i, values[i])`; returns (slope, intercept).
/// `None` for fewer than two points or a fit that does not converge.
pub fn fit_line(values: &[f64]) -> Option<(f64, f64)> {
    let n_samples = values.len();
    if n_samples < MIN_DAYS {
        return None;
    }

    let x_data: Vec<f64> = (0..n_samples).map(|i| i as f64).collect();
    let records = Array2::from_shape_vec((n_samples, 1), x_data).ok()?;
    let targets = Array1::from_vec(values.to_vec());
    let dataset = Dataset::new(records, targets);

    let model = LinearRegression::default().fit(&dataset).ok()?;
    let slope = model.params()[0];
    let intercept = model.intercept();

    if slope.is_finite() && intercept.is_finite() {
        Some((slope, intercept))
    } else {
        None
    }
}

/// Daily slope of one exercise's history, ordered by day index.
///
/// Days are indexed by position, so gaps between training days do not
/// stretch the x axis. Fewer than two days, or a degenerate fit, give 0.0.
pub fn trend_slope<'a, I>(sessions: I) -> f64
where
    I: IntoIterator<Item = &'a ExerciseSession>,
{
    let values: Vec<f64> = daily_means(sessions).into_iter().map(|(_, v)| v).collect();
    if values.len() < MIN_DAYS {
        return 0.0;
    }

    match fit_line(&values) {
        Some((slope, _)) => slope,
        None => {
            debug!("Trend fit failed over {} days, using 0.0", values.len());
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::create_session;
    use crate::exercises::Exercise;

    #[test]
    fn test_daily_means_groups_same_day() {
        let sessions = vec![
            create_session(Exercise::PushUps, 10, 2),
            create_session(Exercise::PushUps, 20, 1),
            create_session(Exercise::PushUps, 30, 2),
        ];
        let days = daily_means(&sessions);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(days[0].1, 20.0);
        assert_eq!(days[1].1, 20.0);
    }

    #[test]
    fn test_fit_line_perfect_data() {
        let (slope, intercept) = fit_line(&[10.0, 12.0, 14.0, 16.0]).unwrap();
        assert!((slope - 2.0).abs() < 1e-6, "slope: {}", slope);
        assert!((intercept - 10.0).abs() < 1e-6, "intercept: {}", intercept);
    }

    #[test]
    fn test_fit_line_too_short() {
        assert!(fit_line(&[]).is_none());
        assert!(fit_line(&[5.0]).is_none());
    }

    #[test]
    fn test_single_day_is_flat() {
        let sessions = vec![
            create_session(Exercise::Squats, 10, 4),
            create_session(Exercise::Squats, 40, 4),
        ];
        assert_eq!(trend_slope(&sessions), 0.0);
    }

    #[test]
    fn test_empty_is_flat() {
        let sessions: Vec<ExerciseSession> = vec![];
        assert_eq!(trend_slope(&sessions), 0.0);
    }

    #[test]
    fn test_gaps_do_not_stretch_axis() {
        // Days 1, 10, 20: indexed 0, 1, 2 so slope is per training day
        let sessions = vec![
            create_session(Exercise::Squats, 10, 1),
            create_session(Exercise::Squats, 15, 10),
            create_session(Exercise::Squats, 20, 20),
        ];
        let slope = trend_slope(&sessions);
        assert!((slope - 5.0).abs() < 1e-6, "slope: {}", slope);
    }

    #[test]
    fn test_declining_trend() {
        let sessions = vec![
            create_session(Exercise::Plank, 60, 1),
            create_session(Exercise::Plank, 50, 2),
            create_session(Exercise::Plank, 40, 3),
        ];
        assert!(trend_slope(&sessions) < -0.2);
    }
}
