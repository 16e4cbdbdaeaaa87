//! # Costmap collision checking

use log::trace;

use crate::{
    loc::Pose2D,
    map::{OccupancyGrid, SearchWindow},
};

/// Whether the footprint around `pose` overlaps any occupied cell of `grid`.
///
/// The footprint is the square window of side `margin_m` centred on the pose, clipped to the grid.
/// Unknown cells don't block. A pose whose window is entirely outside the grid never overlaps.
pub fn overlaps(pose: &Pose2D, grid: &OccupancyGrid, margin_m: f64) -> bool {
    let window = match SearchWindow::around(grid, &pose.position_m, margin_m, margin_m) {
        Some(w) => w,
        None => return false,
    };

    let hit = grid.window_view(&window).iter().any(|v| *v > 0);

    trace!(
        "Costmap lookup at ({:.2}, {:.2}): {}",
        pose.position_m.x,
        pose.position_m.y,
        if hit { "occupied" } else { "clear" }
    );

    hit
}
