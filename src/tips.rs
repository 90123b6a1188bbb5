//! Tips module - form cues shown before a session

use rand::seq::SliceRandom;

use crate::exercises::Exercise;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TipCategory {
    Setup,     // Starting position
    Technique, // Movement quality
    Breathing,
    Camera,    // Being visible to the pose estimator
}

impl TipCategory {
    pub fn emoji(&self) -> &'static str {
        match self {
            TipCategory::Setup => "📐",
            TipCategory::Technique => "🏋️",
            TipCategory::Breathing => "🌬️",
            TipCategory::Camera => "📷",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TipCategory::Setup => "Setup",
            TipCategory::Technique => "Technique",
            TipCategory::Breathing => "Breathing",
            TipCategory::Camera => "Camera",
        }
    }
}

pub struct Tip {
    pub category: TipCategory,
    /// `None` = applies to every exercise
    pub exercise: Option<Exercise>,
    pub text: &'static str,
}

pub const TIPS: &[Tip] = &[
    // === GENERAL ===
    Tip {
        category: TipCategory::Camera,
        exercise: None,
        text: "Keep your whole body in frame: shoulders, hips and ankles must stay visible for counting.",
    },
    Tip {
        category: TipCategory::Camera,
        exercise: None,
        text: "Stand side-on for push-ups and plank, face the camera for jumping jacks and curls.",
    },
    Tip {
        category: TipCategory::Breathing,
        exercise: None,
        text: "Exhale on the effort, inhale on the way back. Never hold your breath through a set.",
    },
    Tip {
        category: TipCategory::Technique,
        exercise: None,
        text: "Controlled tempo beats speed: reps that bounce through the bottom may not count.",
    },

    // === PUSH-UPS ===
    Tip {
        category: TipCategory::Setup,
        exercise: Some(Exercise::PushUps),
        text: "Hands just wider than shoulders, body in one straight line from head to heels.",
    },
    Tip {
        category: TipCategory::Technique,
        exercise: Some(Exercise::PushUps),
        text: "Lower until the elbows pass 90 degrees, then press back to fully straight arms.",
    },

    // === SQUATS ===
    Tip {
        category: TipCategory::Setup,
        exercise: Some(Exercise::Squats),
        text: "Feet shoulder-width apart, toes slightly out, weight through the heels.",
    },
    Tip {
        category: TipCategory::Technique,
        exercise: Some(Exercise::Squats),
        text: "Sit back until the thighs are at least parallel, then stand tall to lock out the knees.",
    },

    // === JUMPING JACKS ===
    Tip {
        category: TipCategory::Technique,
        exercise: Some(Exercise::JumpingJacks),
        text: "Bring hands and feet all the way together each cycle; half-closed reps are not counted.",
    },
    Tip {
        category: TipCategory::Technique,
        exercise: Some(Exercise::JumpingJacks),
        text: "Land softly on the balls of your feet with knees slightly bent.",
    },

    // === PLANK ===
    Tip {
        category: TipCategory::Setup,
        exercise: Some(Exercise::Plank),
        text: "Elbows under shoulders, squeeze glutes and brace the core.",
    },
    Tip {
        category: TipCategory::Technique,
        exercise: Some(Exercise::Plank),
        text: "The timer pauses while the hips sag or pike. Keep shoulders, hips and ankles in line.",
    },

    // === BICEP CURLS ===
    Tip {
        category: TipCategory::Setup,
        exercise: Some(Exercise::BicepCurls),
        text: "Pin the elbows to your sides; only the forearms should move.",
    },
    Tip {
        category: TipCategory::Technique,
        exercise: Some(Exercise::BicepCurls),
        text: "Straighten the arms fully at the bottom before curling up again.",
    },
];

/// Tips relevant to an exercise, general ones included
pub fn tips_for(exercise: Exercise) -> Vec<&'static Tip> {
    TIPS.iter()
        .filter(|t| t.exercise.is_none_or(|e| e == exercise))
        .collect()
}

/// Random tip for an exercise
pub fn random_tip(exercise: Exercise) -> Option<&'static Tip> {
    tips_for(exercise).choose(&mut rand::thread_rng()).copied()
}

/// Format tip for console output
pub fn format_tip(tip: &Tip) -> String {
    format!("{} {}: {}", tip.category.emoji(), tip.category.name(), tip.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_exercise_has_specific_tips() {
        for exercise in Exercise::all() {
            assert!(
                TIPS.iter().any(|t| t.exercise == Some(*exercise)),
                "No tips for {}",
                exercise
            );
        }
    }

    #[test]
    fn test_tips_for_excludes_other_exercises() {
        let tips = tips_for(Exercise::Plank);
        assert!(tips.iter().all(|t| t.exercise.is_none() || t.exercise == Some(Exercise::Plank)));
        assert!(tips.iter().any(|t| t.exercise.is_none()));
    }

    #[test]
    fn test_random_tip_is_relevant() {
        for _ in 0..20 {
            let tip = random_tip(Exercise::Squats).unwrap();
            assert!(tip.exercise.is_none() || tip.exercise == Some(Exercise::Squats));
        }
    }

    #[test]
    fn test_format_tip() {
        let formatted = format_tip(&TIPS[0]);
        assert!(formatted.starts_with("📷 Camera:"));
    }
}
