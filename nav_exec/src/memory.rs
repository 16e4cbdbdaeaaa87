//! # Avoidance memory
//!
//! The only state carried from one control tick to the next. Everything else is recomputed from
//! the latest sensor samples.

use serde::Serialize;

/// Hysteresis state owned by the movement controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AvoidanceMemory {
    /// Side chosen by the last emergency avoidance, `+1` for left and `-1` for right.
    pub avoidance_sign: Option<f64>,

    /// Escape sector `(x, y)` the robot was last turned to face.
    pub last_escape_sector: Option<(usize, usize)>,
}

impl AvoidanceMemory {
    /// The remembered avoidance side, defaulting to the left when nothing has been chosen yet.
    pub fn sign_or_left(&self) -> f64 {
        self.avoidance_sign.unwrap_or(1.0)
    }
}
