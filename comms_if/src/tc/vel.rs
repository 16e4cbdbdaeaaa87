//! # Velocity demands

use serde::{Deserialize, Serialize};

/// A velocity demand for the base, in the robot body frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityCmd {
    /// Forward speed in meters/second, negative is backwards.
    pub linear_ms: f64,

    /// Turn rate in radians/second.
    ///
    /// Follows the right hand rule about the robot's Z+ (upwards) axis, so that a positive turn
    /// rate will rotate the robot to the left.
    pub angular_rads: f64,
}

impl VelocityCmd {
    pub fn new(linear_ms: f64, angular_rads: f64) -> Self {
        Self {
            linear_ms,
            angular_rads,
        }
    }

    /// Zero velocity
    pub fn stop() -> Self {
        Self::default()
    }

    /// Turn on the spot at the given rate
    pub fn point_turn(angular_rads: f64) -> Self {
        Self::new(0.0, angular_rads)
    }

    /// Drive straight at the given speed
    pub fn straight(linear_ms: f64) -> Self {
        Self::new(linear_ms, 0.0)
    }
}
