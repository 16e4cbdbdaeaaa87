//! # Occupancy grid data
//!
//! Grids are sent as a flat row-major array, cell `(x, y)` is at `data[y * width + x]`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Cell value of an unobserved cell
pub const UNKNOWN_CELL: i8 = -1;

/// Cell value of a certainly occupied cell
pub const LETHAL_CELL: i8 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Geometry of an occupancy grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridInfo {
    /// Number of cells along X
    pub width: usize,

    /// Number of cells along Y
    pub height: usize,

    /// Side length of a cell in meters
    pub resolution_m: f64,

    /// X position of the corner of cell (0, 0) in the grid's frame
    pub origin_x_m: f64,

    /// Y position of the corner of cell (0, 0) in the grid's frame
    pub origin_y_m: f64,
}

/// A flat occupancy grid as produced by the grid provider.
///
/// Values are `-1` for unknown cells and `0..=100` for the occupancy probability otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMsg {
    pub info: GridInfo,

    pub data: Vec<i8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GridMsgError {
    #[error("Grid data has {0} cells but the info describes {1}x{2}")]
    ShapeMismatch(usize, usize, usize),

    #[error("Grid resolution must be positive, found {0}")]
    InvalidResolution(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GridMsg {
    /// Create a grid of the given size with every cell set to `value`.
    pub fn filled(info: GridInfo, value: i8) -> Self {
        Self {
            data: vec![value; info.width * info.height],
            info,
        }
    }

    /// Check that the data matches the grid geometry.
    pub fn validate(&self) -> Result<(), GridMsgError> {
        if !(self.info.resolution_m > 0.0) {
            return Err(GridMsgError::InvalidResolution(self.info.resolution_m));
        }
        if self.data.len() != self.info.width * self.info.height {
            return Err(GridMsgError::ShapeMismatch(
                self.data.len(),
                self.info.width,
                self.info.height,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn info() -> GridInfo {
        GridInfo {
            width: 4,
            height: 3,
            resolution_m: 0.5,
            origin_x_m: 0.0,
            origin_y_m: 0.0,
        }
    }

    #[test]
    fn test_validate() {
        assert_eq!(GridMsg::filled(info(), 0).validate(), Ok(()));

        let mut msg = GridMsg::filled(info(), 0);
        msg.data.pop();
        assert_eq!(msg.validate(), Err(GridMsgError::ShapeMismatch(11, 4, 3)));

        let mut msg = GridMsg::filled(info(), 0);
        msg.info.resolution_m = 0.0;
        assert_eq!(msg.validate(), Err(GridMsgError::InvalidResolution(0.0)));
    }
}
