//! Joint angle and distance on normalized image coordinates

use serde::{Deserialize, Serialize};

/// A 2D point in normalized image space (x, y in [0, 1], y pointing down)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point::new(x, y)
    }
}

/// Angle in degrees at vertex `b` between the rays `b→a` and `b→c`.
///
/// Takes the difference of the two rays' polar angles and folds it to the
/// interior angle, so the result is in [0, 180] and does not depend on which
/// side is passed first. Coincident points are not an error: `atan2(0, 0)` is
/// 0, so a degenerate ray simply contributes a polar angle of 0.
pub fn angle(a: Point, b: Point, c: Point) -> f64 {
    let ray_a = (a.y - b.y).atan2(a.x - b.x);
    let ray_c = (c.y - b.y).atan2(c.x - b.x);
    let raw = (ray_c - ray_a).to_degrees().abs() % 360.0;
    if raw > 180.0 { 360.0 - raw } else { raw }
}

/// Euclidean distance between two points
pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_right_angle() {
        let a = angle(p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0));
        assert!((a - 90.0).abs() < EPS, "angle: {}", a);
    }

    #[test]
    fn test_straight_line() {
        let a = angle(p(0.5, 0.2), p(0.5, 0.5), p(0.5, 0.8));
        assert!((a - 180.0).abs() < EPS, "angle: {}", a);
    }

    #[test]
    fn test_reflex_difference_folds_to_interior() {
        // Polar angles 170° and -170° differ by 340°, the interior angle is 20°
        let b = p(0.0, 0.0);
        let a = p((170.0f64).to_radians().cos(), (170.0f64).to_radians().sin());
        let c = p((-170.0f64).to_radians().cos(), (-170.0f64).to_radians().sin());
        let result = angle(a, b, c);
        assert!((result - 20.0).abs() < 1e-6, "angle: {}", result);
    }

    #[test]
    fn test_angle_symmetry_and_range() {
        let points = [
            p(0.1, 0.9),
            p(0.4, 0.4),
            p(0.9, 0.2),
            p(0.5, 0.5),
            p(0.0, 0.0),
            p(1.0, 1.0),
            p(0.3, 0.7),
        ];
        for a in points {
            for b in points {
                for c in points {
                    let forward = angle(a, b, c);
                    let backward = angle(c, b, a);
                    assert_eq!(forward, backward, "a={:?} b={:?} c={:?}", a, b, c);
                    assert!((0.0..=180.0).contains(&forward), "out of range: {}", forward);
                }
            }
        }
    }

    #[test]
    fn test_coincident_points_are_finite() {
        let same = p(0.5, 0.5);
        let a = angle(same, same, same);
        assert!(a.is_finite());
        assert_eq!(a, 0.0);
    }

    #[test]
    fn test_distance() {
        assert!((distance(p(0.0, 0.0), p(0.3, 0.4)) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_distance_symmetry_and_identity() {
        let points = [p(0.1, 0.9), p(0.4, 0.4), p(0.9, 0.2), p(0.0, 1.0)];
        for a in points {
            assert_eq!(distance(a, a), 0.0);
            for b in points {
                assert_eq!(distance(a, b), distance(b, a));
            }
        }
    }

    #[test]
    fn test_midpoint() {
        let mid = p(0.2, 0.4).midpoint(p(0.4, 0.8));
        assert!((mid.x - 0.3).abs() < EPS && (mid.y - 0.6).abs() < EPS, "mid: {:?}", mid);
    }
}
