//! # Localisation module
//!
//! Poses of the robot and of its goals on the ground plane. Localisation itself is performed
//! upstream, this module only provides the types and the geometry on them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use util::maths::{ang_diff, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The position and heading of the robot, or of a goal, in the frame of the stamp it's sent with.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Pose2D {
    /// The position in meters
    pub position_m: Vector2<f64>,

    /// The heading (angle to the positive X axis) in radians, in the range (-pi, pi].
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2D {
    /// Create a new pose, wrapping the heading into (-pi, pi].
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad: wrap_pi(heading_rad),
        }
    }

    /// Create a pose at `position_m` facing along `direction`.
    ///
    /// A zero direction gives a heading of zero.
    pub fn facing(position_m: Vector2<f64>, direction: &Vector2<f64>) -> Self {
        Self {
            position_m,
            heading_rad: heading_of(direction).unwrap_or(0.0),
        }
    }

    /// Unit vector pointing along the heading.
    pub fn heading_vec(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// Vector from this pose's position to `point`.
    pub fn vector_to(&self, point: &Vector2<f64>) -> Vector2<f64> {
        point - self.position_m
    }

    /// Straight line distance to `point`.
    pub fn distance_to(&self, point: &Vector2<f64>) -> f64 {
        self.vector_to(point).norm()
    }

    /// Shortest signed rotation from this pose's heading onto `heading_rad`.
    pub fn rotation_to(&self, heading_rad: f64) -> f64 {
        ang_diff(self.heading_rad, heading_rad)
    }

    /// Straight line direction from this pose to `goal`, turned by `bias_rad` towards the side
    /// the goal lies on.
    ///
    /// The bias is applied anticlockwise when the goal is to the left of the current heading,
    /// clockwise when it's to the right, and not at all when it lies on the heading line.
    pub fn biased_direction_to(&self, goal: &Vector2<f64>, bias_rad: f64) -> Vector2<f64> {
        let to_goal = self.vector_to(goal);

        // Z component of heading x to_goal gives the side of the goal
        let cross = self.heading_vec().perp(&to_goal);
        let side = if cross > 0.0 {
            1.0
        } else if cross < 0.0 {
            -1.0
        } else {
            0.0
        };

        Rotation2::new(bias_rad * side) * to_goal
    }
}

/// Heading of a direction vector, or `None` for a zero vector.
pub fn heading_of(direction: &Vector2<f64>) -> Option<f64> {
    if direction.norm_squared() > 0.0 {
        Some(wrap_pi(direction.y.atan2(direction.x)))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_facing() {
        let p = Pose2D::facing(Vector2::new(1.0, 1.0), &Vector2::new(0.0, 2.0));
        assert!((p.heading_rad - FRAC_PI_2).abs() < 1e-12);

        let p = Pose2D::facing(Vector2::new(1.0, 1.0), &Vector2::new(-1.0, 0.0));
        assert!((p.heading_rad - PI).abs() < 1e-12);

        assert_eq!(heading_of(&Vector2::zeros()), None);
    }

    #[test]
    fn test_biased_direction() {
        let pose = Pose2D::new(0.0, 0.0, 0.0);
        let bias = 10f64.to_radians();

        // Goal to the left, bias turns further left
        let dir = pose.biased_direction_to(&Vector2::new(1.0, 1.0), bias);
        let expected = std::f64::consts::FRAC_PI_4 + bias;
        assert!((heading_of(&dir).unwrap() - expected).abs() < 1e-9);
        assert!((dir.norm() - 2f64.sqrt()).abs() < 1e-9);

        // Goal to the right
        let dir = pose.biased_direction_to(&Vector2::new(1.0, -1.0), bias);
        let expected = -std::f64::consts::FRAC_PI_4 - bias;
        assert!((heading_of(&dir).unwrap() - expected).abs() < 1e-9);

        // Goal dead ahead is not biased
        let dir = pose.biased_direction_to(&Vector2::new(3.0, 0.0), bias);
        assert_eq!(dir, Vector2::new(3.0, 0.0));
    }
}
