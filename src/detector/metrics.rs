//! Form metrics extracted from a landmark frame
//!
//! Every metric needs both sides of the body; a missing joint on either side
//! yields `None` and the frame is handled like one without landmarks.

use crate::config::SpreadProfile;
use crate::pose::{Joint, LandmarkFrame, angle, distance};

/// Average of the left and right angle at the middle joint of each triple
fn bilateral_angle(frame: &LandmarkFrame, left: [Joint; 3], right: [Joint; 3]) -> Option<f64> {
    let side = |[a, b, c]: [Joint; 3]| -> Option<f64> {
        Some(angle(frame.get(a)?, frame.get(b)?, frame.get(c)?))
    };
    Some((side(left)? + side(right)?) / 2.0)
}

/// Shoulder-elbow-wrist angle, both arms averaged
pub fn elbow_angle(frame: &LandmarkFrame) -> Option<f64> {
    bilateral_angle(
        frame,
        [Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist],
        [Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist],
    )
}

/// Hip-knee-ankle angle, both legs averaged
pub fn knee_angle(frame: &LandmarkFrame) -> Option<f64> {
    bilateral_angle(
        frame,
        [Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle],
        [Joint::RightHip, Joint::RightKnee, Joint::RightAnkle],
    )
}

/// Shoulder-hip-ankle angle: 180 is a straight body line
pub fn body_line_angle(frame: &LandmarkFrame) -> Option<f64> {
    bilateral_angle(
        frame,
        [Joint::LeftShoulder, Joint::LeftHip, Joint::LeftAnkle],
        [Joint::RightShoulder, Joint::RightHip, Joint::RightAnkle],
    )
}

/// Hand and foot separation in hip widths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub hands: f64,
    pub legs: f64,
}

pub fn limb_spread(frame: &LandmarkFrame, profile: &SpreadProfile) -> Option<Spread> {
    let hip_width = distance(frame.get(Joint::LeftHip)?, frame.get(Joint::RightHip)?);
    let hip_width = if hip_width > profile.min_hip_width {
        hip_width
    } else {
        profile.fallback_hip_width
    };

    let hands = distance(frame.get(Joint::LeftWrist)?, frame.get(Joint::RightWrist)?);
    let legs = distance(frame.get(Joint::LeftAnkle)?, frame.get(Joint::RightAnkle)?);

    Some(Spread {
        hands: hands / hip_width,
        legs: legs / hip_width,
    })
}
