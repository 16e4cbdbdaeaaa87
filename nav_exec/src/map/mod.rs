//! # Map
//!
//! This module implements the [`OccupancyGrid`] used for all costmap queries, and the
//! [`SearchWindow`] which bounds every query to a rectangle of cells around a point.

// ------------------------------------------------------------------------------------------------
// MODS
// ------------------------------------------------------------------------------------------------

/// Implements the [`OccupancyGrid`] type
mod occ_grid;

/// Implements the [`SearchWindow`] type
mod search_window;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use occ_grid::{GridError, OccupancyGrid};
pub use search_window::SearchWindow;
