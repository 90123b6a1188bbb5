//! 7-day mini plan and its CSV export

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::exercises::Exercise;

/// Days (from today) that get a session; weekday is not considered
pub const PLAN_DAY_OFFSETS: [i64; 3] = [0, 2, 4];
pub const PLAN_HORIZON_DAYS: i64 = 7;
pub const MAX_PLAN_SESSIONS: usize = 3;
pub const PLAN_NOTE: &str = "Focus on form + controlled tempo";

/// Target used if an exercise somehow has no computed target
const FALLBACK_TARGET: u32 = 10;

/// One scheduled session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    pub date: NaiveDate,
    pub exercise: Exercise,
    pub target: u32,
    pub note: String,
}

/// Schedule up to three sessions over the next week: the weakest exercise
/// first, then the first of `others` (or the weakest again), then the
/// strongest (or the weakest again).
pub fn build_mini_plan<F>(
    today: NaiveDate,
    weakest: Exercise,
    others: &[Exercise],
    strongest: Option<Exercise>,
    target_for: F,
) -> Vec<PlanEntry>
where
    F: Fn(Exercise) -> Option<u32>,
{
    let mut plan: Vec<PlanEntry> = Vec::with_capacity(MAX_PLAN_SESSIONS);

    for offset in 0..PLAN_HORIZON_DAYS {
        if plan.len() >= MAX_PLAN_SESSIONS {
            break;
        }
        if !PLAN_DAY_OFFSETS.contains(&offset) {
            continue;
        }

        let exercise = match plan.len() {
            0 => weakest,
            1 => others.first().copied().unwrap_or(weakest),
            _ => strongest.unwrap_or(weakest),
        };

        plan.push(PlanEntry {
            date: today + Duration::days(offset),
            exercise,
            target: target_for(exercise).unwrap_or(FALLBACK_TARGET),
            note: PLAN_NOTE.to_string(),
        });
    }

    plan
}

#[derive(Serialize)]
struct PlanRow<'a> {
    date: String,
    exercise: &'a str,
    target: u32,
    note: &'a str,
}

/// Write the plan as CSV (date, exercise, target, note)
pub fn write_plan_csv<W: Write>(plan: &[PlanEntry], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in plan {
        csv_writer.serialize(PlanRow {
            date: entry.date.format("%Y-%m-%d").to_string(),
            exercise: entry.exercise.name(),
            target: entry.target,
            note: &entry.note,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Save the plan to a CSV file
pub fn export_plan(plan: &[PlanEntry], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_plan_csv(plan, file)?;
    info!("Exported {} plan entries to {}", plan.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn targets(ex: Exercise) -> Option<u32> {
        match ex {
            Exercise::Squats => Some(22),
            Exercise::PushUps => Some(11),
            Exercise::Plank => Some(66),
            _ => None,
        }
    }

    #[test]
    fn test_plan_days_and_order() {
        let plan = build_mini_plan(
            today(),
            Exercise::PushUps,
            &[Exercise::Plank, Exercise::Squats],
            Some(Exercise::Squats),
            targets,
        );

        assert_eq!(plan.len(), 3);
        let dates: Vec<_> = plan.iter().map(|e| e.date.format("%Y-%m-%d").to_string()).collect();
        assert_eq!(dates, vec!["2025-03-10", "2025-03-12", "2025-03-14"]);
        let exercises: Vec<_> = plan.iter().map(|e| e.exercise).collect();
        assert_eq!(exercises, vec![Exercise::PushUps, Exercise::Plank, Exercise::Squats]);
        assert_eq!(plan[0].target, 11);
        assert_eq!(plan[1].target, 66);
        assert!(plan.iter().all(|e| e.note == PLAN_NOTE));
    }

    #[test]
    fn test_single_exercise_plan_repeats_it() {
        let plan = build_mini_plan(today(), Exercise::Squats, &[], None, targets);
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|e| e.exercise == Exercise::Squats && e.target == 22));
    }

    #[test]
    fn test_missing_target_falls_back() {
        let plan = build_mini_plan(today(), Exercise::BicepCurls, &[], None, targets);
        assert_eq!(plan[0].target, FALLBACK_TARGET);
    }

    #[test]
    fn test_plan_csv() {
        let plan = build_mini_plan(today(), Exercise::Squats, &[Exercise::PushUps], None, targets);
        let mut out = Vec::new();
        write_plan_csv(&plan, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "date,exercise,target,note");
        assert_eq!(lines[1], "2025-03-10,Squats,22,Focus on form + controlled tempo");
        assert_eq!(lines[2], "2025-03-12,Push-ups,11,Focus on form + controlled tempo");
        assert_eq!(lines.len(), 4);
    }
}
