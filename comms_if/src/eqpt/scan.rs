//! # Range scan data

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One sweep of a planar range sensor.
///
/// Angles follow the right hand rule about the robot's Z+ axis, so the first return
/// (`angle_min`, negative) is on the robot's right and the last (`angle_max`) on its left. Absent
/// returns are `NaN`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeScan {
    /// Angle of the first return in radians
    pub angle_min: f64,

    /// Angle of the last return in radians
    pub angle_max: f64,

    /// Angular distance between returns in radians
    pub angle_increment: f64,

    /// Measured distances in meters, `NaN` where there was no return
    pub ranges: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RangeScan {
    /// Build a scan spanning `[angle_min, angle_max]` from the given ranges, deriving the
    /// increment from the number of returns.
    pub fn from_ranges(angle_min: f64, angle_max: f64, ranges: Vec<f64>) -> Self {
        let angle_increment = if ranges.len() > 1 {
            (angle_max - angle_min) / (ranges.len() - 1) as f64
        } else {
            0.0
        };

        Self {
            angle_min,
            angle_max,
            angle_increment,
            ranges,
        }
    }

    /// Number of returns in the scan
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Angle of the return at `index`.
    pub fn angle_of(&self, index: usize) -> f64 {
        self.angle_min + self.angle_increment * index as f64
    }

    /// Angle a return at `index` would have, extrapolated beyond either end of the scan.
    pub fn angle_at(&self, index: i64) -> f64 {
        self.angle_min + self.angle_increment * index as f64
    }

    /// Index of the return whose angle is closest to `angle`, or `None` for an empty scan.
    pub fn nearest_index(&self, angle: f64) -> Option<usize> {
        if self.ranges.is_empty() {
            return None;
        }
        if self.angle_increment <= 0.0 {
            return Some(0);
        }

        let idx = ((angle - self.angle_min) / self.angle_increment).round();
        let max = (self.ranges.len() - 1) as f64;

        Some(idx.max(0.0).min(max) as usize)
    }

    /// Range at `index` if there was a return.
    pub fn range(&self, index: usize) -> Option<f64> {
        match self.ranges.get(index) {
            Some(r) if !r.is_nan() => Some(*r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_angles() {
        let scan = RangeScan::from_ranges(-1.0, 1.0, vec![1.0; 5]);

        assert_eq!(scan.angle_increment, 0.5);
        assert_eq!(scan.angle_of(0), -1.0);
        assert_eq!(scan.angle_of(4), 1.0);
        assert_eq!(scan.nearest_index(0.0), Some(2));
        assert_eq!(scan.nearest_index(0.3), Some(3));
        assert_eq!(scan.nearest_index(-5.0), Some(0));
        assert_eq!(scan.nearest_index(5.0), Some(4));
    }

    #[test]
    fn test_missing_returns() {
        let scan = RangeScan::from_ranges(-1.0, 1.0, vec![1.0, std::f64::NAN, 2.0]);

        assert_eq!(scan.range(0), Some(1.0));
        assert_eq!(scan.range(1), None);
        assert_eq!(scan.range(7), None);
        assert_eq!(RangeScan::from_ranges(0.0, 0.0, vec![]).nearest_index(0.0), None);
    }
}
