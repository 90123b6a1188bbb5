//! Landmark frames - typed joints from the external pose estimator

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::geometry::Point;

/// Body joints the detectors look at, with their MediaPipe Pose indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub fn all() -> &'static [Joint] {
        &[
            Joint::LeftShoulder,
            Joint::RightShoulder,
            Joint::LeftElbow,
            Joint::RightElbow,
            Joint::LeftWrist,
            Joint::RightWrist,
            Joint::LeftHip,
            Joint::RightHip,
            Joint::LeftKnee,
            Joint::RightKnee,
            Joint::LeftAnkle,
            Joint::RightAnkle,
        ]
    }

    /// Index in the 33-landmark MediaPipe Pose output
    pub fn mediapipe_index(&self) -> usize {
        match self {
            Joint::LeftShoulder => 11,
            Joint::RightShoulder => 12,
            Joint::LeftElbow => 13,
            Joint::RightElbow => 14,
            Joint::LeftWrist => 15,
            Joint::RightWrist => 16,
            Joint::LeftHip => 23,
            Joint::RightHip => 24,
            Joint::LeftKnee => 25,
            Joint::RightKnee => 26,
            Joint::LeftAnkle => 27,
            Joint::RightAnkle => 28,
        }
    }

    pub fn from_mediapipe_index(index: usize) -> Option<Joint> {
        Joint::all().iter().copied().find(|j| j.mediapipe_index() == index)
    }

    /// Key used for this joint in named-joint frames
    pub fn name(&self) -> &'static str {
        match self {
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
        }
    }

    pub fn from_name(name: &str) -> Option<Joint> {
        Joint::all().iter().copied().find(|j| j.name() == name)
    }
}

/// One captured frame worth of landmarks for a single person.
///
/// Only finite coordinates make it in; anything else is treated as a
/// missing joint, which the detectors report as "no landmarks".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkFrame {
    points: HashMap<Joint, Point>,
}

impl LandmarkFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from named joints, dropping non-finite coordinates
    pub fn from_joints<I>(joints: I) -> Self
    where
        I: IntoIterator<Item = (Joint, Point)>,
    {
        let mut frame = Self::new();
        for (joint, point) in joints {
            frame.insert(joint, point);
        }
        frame
    }

    /// Build from the raw MediaPipe landmark array (index → [x, y]).
    /// Indices past the end of a truncated array are simply absent.
    pub fn from_mediapipe(landmarks: &[[f64; 2]]) -> Self {
        Self::from_joints(Joint::all().iter().filter_map(|joint| {
            landmarks
                .get(joint.mediapipe_index())
                .map(|&xy| (*joint, Point::from(xy)))
        }))
    }

    /// Insert a joint; returns false when the point was rejected
    pub fn insert(&mut self, joint: Joint, point: Point) -> bool {
        if !(point.x.is_finite() && point.y.is_finite()) {
            debug!("Dropping non-finite landmark {:?}: {:?}", joint, point);
            return false;
        }
        self.points.insert(joint, point);
        true
    }

    pub fn get(&self, joint: Joint) -> Option<Point> {
        self.points.get(&joint).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate present joints in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (Joint, Point)> + '_ {
        self.points.iter().map(|(j, p)| (*j, *p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mediapipe_index_round_trip() {
        for joint in Joint::all() {
            assert_eq!(Joint::from_mediapipe_index(joint.mediapipe_index()), Some(*joint));
        }
        assert_eq!(Joint::from_mediapipe_index(0), None);
    }

    #[test]
    fn test_name_matches_serde() {
        for joint in Joint::all() {
            let encoded = serde_json::to_string(joint).unwrap();
            assert_eq!(encoded, format!("\"{}\"", joint.name()));
            assert_eq!(Joint::from_name(joint.name()), Some(*joint));
        }
        assert_eq!(Joint::from_name("nose"), None);
    }

    #[test]
    fn test_from_mediapipe_full_array() {
        let mut raw = [[0.0; 2]; 33];
        raw[13] = [0.25, 0.5];
        let frame = LandmarkFrame::from_mediapipe(&raw);
        assert_eq!(frame.len(), Joint::all().len());
        assert_eq!(frame.get(Joint::LeftElbow), Some(Point::new(0.25, 0.5)));
    }

    #[test]
    fn test_from_mediapipe_truncated_array() {
        let raw = [[0.5; 2]; 20];
        let frame = LandmarkFrame::from_mediapipe(&raw);
        assert!(frame.get(Joint::LeftWrist).is_some());
        assert!(frame.get(Joint::LeftHip).is_none());
    }

    #[test]
    fn test_non_finite_points_dropped() {
        let mut frame = LandmarkFrame::new();
        assert!(!frame.insert(Joint::LeftKnee, Point::new(f64::NAN, 0.5)));
        assert!(!frame.insert(Joint::LeftKnee, Point::new(0.5, f64::INFINITY)));
        assert!(frame.is_empty());
        assert!(frame.insert(Joint::LeftKnee, Point::new(0.5, 0.5)));
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn test_joint_serde_names() {
        let json = serde_json::to_string(&Joint::RightAnkle).unwrap();
        assert_eq!(json, "\"right_ankle\"");
    }
}
