//! Pose module - 2D landmark frames and the geometry computed from them

pub mod geometry;
pub mod landmarks;

pub use geometry::{Point, angle, distance};
pub use landmarks::{Joint, LandmarkFrame};
