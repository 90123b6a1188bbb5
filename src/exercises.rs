//! Exercise definitions - the fixed set of tracked movements

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Movement family, decides which state machine drives the detector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Push,   // Push-ups
    Legs,   // Squats
    Cardio, // Jumping jacks
    Core,   // Plank
    Pull,   // Curls
}

impl Category {
    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Push => "💪",
            Category::Legs => "🦵",
            Category::Cardio => "🤸",
            Category::Core => "🎯",
            Category::Pull => "🏋️",
        }
    }
}

/// Tracked exercise. Serialized with the display name used in the session log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Exercise {
    #[serde(rename = "Push-ups")]
    PushUps,
    #[serde(rename = "Squats")]
    Squats,
    #[serde(rename = "Jumping Jacks")]
    JumpingJacks,
    #[serde(rename = "Plank")]
    Plank,
    #[serde(rename = "Bicep Curls")]
    BicepCurls,
}

impl Exercise {
    /// All exercises in selection order
    pub fn all() -> &'static [Exercise] {
        &[
            Exercise::PushUps,
            Exercise::Squats,
            Exercise::JumpingJacks,
            Exercise::Plank,
            Exercise::BicepCurls,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Exercise::PushUps => "Push-ups",
            Exercise::Squats => "Squats",
            Exercise::JumpingJacks => "Jumping Jacks",
            Exercise::Plank => "Plank",
            Exercise::BicepCurls => "Bicep Curls",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Exercise::PushUps => Category::Push,
            Exercise::Squats => Category::Legs,
            Exercise::JumpingJacks => Category::Cardio,
            Exercise::Plank => Category::Core,
            Exercise::BicepCurls => Category::Pull,
        }
    }

    /// true = held for time (plank), false = counted in reps
    pub fn is_timed(&self) -> bool {
        matches!(self, Exercise::Plank)
    }

    /// Unit label for `reps_or_seconds`
    pub fn unit(&self) -> &'static str {
        if self.is_timed() { "s" } else { "reps" }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Exercise {
    type Err = anyhow::Error;

    /// Accepts the display name or a loose spelling ("pushups", "bicep-curls")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .collect();

        Exercise::all()
            .iter()
            .copied()
            .find(|e| {
                let name: String = e
                    .name()
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .flat_map(|c| c.to_lowercase())
                    .collect();
                name == key
            })
            .ok_or_else(|| anyhow::anyhow!("unknown exercise '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_display_names() {
        for ex in Exercise::all() {
            assert_eq!(ex.name().parse::<Exercise>().unwrap(), *ex);
        }
    }

    #[test]
    fn test_display_honours_width() {
        assert_eq!(format!("[{:14}]", Exercise::Plank), "[Plank         ]");
        assert_eq!(format!("[{:>8}]", Exercise::Squats), "[  Squats]");
        assert_eq!(Exercise::PushUps.to_string(), "Push-ups");
    }

    #[test]
    fn test_parse_loose_spelling() {
        assert_eq!("pushups".parse::<Exercise>().unwrap(), Exercise::PushUps);
        assert_eq!("bicep-curls".parse::<Exercise>().unwrap(), Exercise::BicepCurls);
        assert_eq!("JUMPING_JACKS".parse::<Exercise>().unwrap(), Exercise::JumpingJacks);
    }

    #[test]
    fn test_parse_unknown() {
        assert!("burpees".parse::<Exercise>().is_err());
    }

    #[test]
    fn test_only_plank_is_timed() {
        let timed: Vec<_> = Exercise::all().iter().filter(|e| e.is_timed()).collect();
        assert_eq!(timed, vec![&Exercise::Plank]);
        assert_eq!(Exercise::Plank.unit(), "s");
        assert_eq!(Exercise::Squats.unit(), "reps");
    }

    #[test]
    fn test_serde_uses_display_name() {
        let json = serde_json::to_string(&Exercise::JumpingJacks).unwrap();
        assert_eq!(json, "\"Jumping Jacks\"");
        let back: Exercise = serde_json::from_str("\"Bicep Curls\"").unwrap();
        assert_eq!(back, Exercise::BicepCurls);
    }
}
