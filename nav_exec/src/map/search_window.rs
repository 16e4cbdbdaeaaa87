//! # Search Window

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;

use super::OccupancyGrid;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A rectangle of cells around a point, clipped to the bounds of a grid.
///
/// All edges are inclusive cell indices. `top` is the lowest Y index and `bottom` the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SearchWindow {
    /// Build the window of `extent_x_m` by `extent_y_m` centred on `centre_m`.
    ///
    /// Edges beyond the grid are clipped to the grid's sides. Returns `None` if the window and the
    /// grid don't overlap at all.
    pub fn around(
        grid: &OccupancyGrid,
        centre_m: &Vector2<f64>,
        extent_x_m: f64,
        extent_y_m: f64,
    ) -> Option<Self> {
        if grid.width() == 0 || grid.height() == 0 {
            return None;
        }

        let half = Vector2::new(extent_x_m.abs() / 2.0, extent_y_m.abs() / 2.0);
        let (left, top) = grid.world_to_index(&(centre_m - half));
        let (right, bottom) = grid.world_to_index(&(centre_m + half));

        let max_x = grid.width() as i64 - 1;
        let max_y = grid.height() as i64 - 1;

        if right < 0 || bottom < 0 || left > max_x || top > max_y {
            return None;
        }

        Some(Self {
            left: left.max(0) as usize,
            right: right.min(max_x) as usize,
            top: top.max(0) as usize,
            bottom: bottom.min(max_y) as usize,
        })
    }

    /// Number of cell steps between the left and right edges.
    pub fn span_x(&self) -> usize {
        self.right - self.left
    }

    /// Number of cell steps between the top and bottom edges.
    pub fn span_y(&self) -> usize {
        self.bottom - self.top
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    /// Iterate over every cell index in the window.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let (left, right) = (self.left, self.right);
        (self.top..=self.bottom).flat_map(move |y| (left..=right).map(move |x| (x, y)))
    }
}
