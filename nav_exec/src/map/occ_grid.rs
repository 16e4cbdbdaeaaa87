//! # Occupancy Grid

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use comms_if::eqpt::grid::{GridInfo, GridMsg, GridMsgError};
use nalgebra::Vector2;
use ndarray::{Array2, ArrayView2};

use super::SearchWindow;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A 2D occupancy grid.
///
/// Cells hold `-1` when unknown and the occupancy probability `0..=100` otherwise. Any cell above
/// zero is treated as blocking, unknown cells are not.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    info: GridInfo,

    /// Cell data, dimension order x cell, y cell
    data: Array2<i8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("Invalid grid message: {0}")]
    InvalidMsg(#[from] GridMsgError),

    #[error("Grid data doesn't match the grid shape: {0}")]
    IncompatibleShape(#[from] ndarray::ShapeError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OccupancyGrid {
    /// Create a new grid with every cell set to `value`.
    pub fn new(info: GridInfo, value: i8) -> Self {
        Self {
            data: Array2::from_elem((info.width, info.height), value),
            info,
        }
    }

    pub fn info(&self) -> &GridInfo {
        &self.info
    }

    pub fn width(&self) -> usize {
        self.info.width
    }

    pub fn height(&self) -> usize {
        self.info.height
    }

    pub fn resolution_m(&self) -> f64 {
        self.info.resolution_m
    }

    /// Get the value of cell `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<i8> {
        self.data.get((x, y)).copied()
    }

    /// Set the value of cell `(x, y)`, cells outside the grid are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: i8) {
        if let Some(c) = self.data.get_mut((x, y)) {
            *c = value;
        }
    }

    /// Set every cell whose centre lies in the rectangle between `min_m` and `max_m`.
    pub fn fill_rect(&mut self, min_m: Vector2<f64>, max_m: Vector2<f64>, value: i8) {
        for x in 0..self.width() {
            for y in 0..self.height() {
                let c = self.index_to_world(x, y);
                if c.x >= min_m.x && c.x <= max_m.x && c.y >= min_m.y && c.y <= max_m.y {
                    self.data[(x, y)] = value;
                }
            }
        }
    }

    /// Whether cell `(x, y)` blocks traversal. Unknown and out of grid cells do not.
    pub fn is_blocked(&self, x: usize, y: usize) -> bool {
        matches!(self.get(x, y), Some(v) if v > 0)
    }

    /// Index of the cell containing `point_m`, which may lie outside the grid.
    pub fn world_to_index(&self, point_m: &Vector2<f64>) -> (i64, i64) {
        let res = self.info.resolution_m;
        (
            ((point_m.x - self.info.origin_x_m) / res).floor() as i64,
            ((point_m.y - self.info.origin_y_m) / res).floor() as i64,
        )
    }

    /// Position of the centre of cell `(x, y)`.
    pub fn index_to_world(&self, x: usize, y: usize) -> Vector2<f64> {
        let res = self.info.resolution_m;
        Vector2::new(
            self.info.origin_x_m + (x as f64 + 0.5) * res,
            self.info.origin_y_m + (y as f64 + 0.5) * res,
        )
    }

    /// View of the cells inside `window`.
    pub fn window_view(&self, window: &SearchWindow) -> ArrayView2<i8> {
        self.data.slice(ndarray::s![
            window.left..=window.right,
            window.top..=window.bottom
        ])
    }

    /// Sum of the positive cell values in the half-open cell ranges given.
    pub fn positive_sum(&self, xs: std::ops::Range<usize>, ys: std::ops::Range<usize>) -> f64 {
        let xs = xs.start.min(self.width())..xs.end.min(self.width());
        let ys = ys.start.min(self.height())..ys.end.min(self.height());
        if xs.start >= xs.end || ys.start >= ys.end {
            return 0.0;
        }

        self.data
            .slice(ndarray::s![xs, ys])
            .iter()
            .filter(|v| **v > 0)
            .map(|v| *v as f64)
            .sum()
    }

    /// Convert back into the flat row-major message form.
    pub fn to_msg(&self) -> GridMsg {
        let mut data = Vec::with_capacity(self.width() * self.height());
        for y in 0..self.height() {
            for x in 0..self.width() {
                data.push(self.data[(x, y)]);
            }
        }

        GridMsg {
            info: self.info,
            data,
        }
    }
}

impl TryFrom<GridMsg> for OccupancyGrid {
    type Error = GridError;

    fn try_from(msg: GridMsg) -> Result<Self, Self::Error> {
        msg.validate()?;

        // Message is row-major (y, x), swap so that indexing is (x, y)
        let data =
            Array2::from_shape_vec((msg.info.height, msg.info.width), msg.data)?.reversed_axes();

        Ok(Self {
            info: msg.info,
            data,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn info(width: usize, height: usize) -> GridInfo {
        GridInfo {
            width,
            height,
            resolution_m: 0.1,
            origin_x_m: -1.0,
            origin_y_m: -2.0,
        }
    }

    #[test]
    fn test_from_msg() {
        let mut msg = GridMsg::filled(info(3, 2), 0);
        // Row-major, cell (2, 1)
        msg.data[1 * 3 + 2] = 100;
        msg.data[0] = -1;

        let grid = OccupancyGrid::try_from(msg.clone()).unwrap();

        assert_eq!(grid.get(2, 1), Some(100));
        assert_eq!(grid.get(0, 0), Some(-1));
        assert_eq!(grid.get(3, 0), None);
        assert!(grid.is_blocked(2, 1));
        assert!(!grid.is_blocked(0, 0));
        assert_eq!(grid.to_msg(), msg);

        msg.data.push(0);
        assert!(OccupancyGrid::try_from(msg).is_err());
    }

    #[test]
    fn test_index_conversion() {
        let grid = OccupancyGrid::new(info(20, 40), 0);

        assert_eq!(grid.world_to_index(&Vector2::new(-1.0, -2.0)), (0, 0));
        assert_eq!(grid.world_to_index(&Vector2::new(-0.05, -1.95)), (9, 0));
        assert_eq!(grid.world_to_index(&Vector2::new(-1.5, 3.0)), (-5, 50));

        let c = grid.index_to_world(9, 0);
        assert!((c.x + 0.05).abs() < 1e-9);
        assert!((c.y + 1.95).abs() < 1e-9);
        assert_eq!(grid.world_to_index(&c), (9, 0));
    }

    #[test]
    fn test_positive_sum() {
        let mut grid = OccupancyGrid::new(info(4, 4), -1);
        grid.set(1, 1, 50);
        grid.set(2, 2, 100);

        assert_eq!(grid.positive_sum(0..2, 0..2), 50.0);
        assert_eq!(grid.positive_sum(0..4, 0..4), 150.0);
        assert_eq!(grid.positive_sum(3..9, 3..9), 0.0);
    }
}
