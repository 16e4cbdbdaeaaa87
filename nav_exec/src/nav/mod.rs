//! # Navigation
//!
//! This module provides costmap based navigation of the robot:
//! - [`overlaps`] - checks whether a pose's footprint overlaps occupied cells.
//! - [`CostmapEscapePlanner`] - drives the robot out of occupied terrain it is standing on.
//! - [`GoalBacktracker`] - finds a clear waypoint before a goal which has become occupied.
//! - [`GoalNavigator`] - submits goals to the planning service and monitors them until they
//!   finish, escaping and backtracking as needed.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod backtrack;
mod collision;
mod escape;
mod goal_nav;

pub use backtrack::GoalBacktracker;
pub use collision::overlaps;
pub use escape::{CostmapEscapePlanner, EscapePlan, EscapeSector};
pub use goal_nav::{GoalNavigator, GoalState};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::{io::SensorKind, map::GridError};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur during navigation.
///
/// None of these are fatal, callers degrade to a safer behaviour (skip the tick, stop, or report
/// the goal as failed).
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("No {0:?} data received within the timeout")]
    SensorTimeout(SensorKind),

    #[error("Received {0:?} data older than data already used")]
    StaleData(SensorKind),

    #[error("The planning service is unavailable")]
    ServiceUnavailable,

    #[error("The planning service produced no route after {attempts} attempts")]
    PathUnavailable { attempts: usize },

    #[error("No transform available from {from} to {to}")]
    TransformUnavailable { from: String, to: String },

    #[error("Received an invalid occupancy grid: {0}")]
    InvalidGrid(#[from] GridError),
}

impl NavError {
    /// Whether the error only means the current tick's data was unusable, so the action should be
    /// retried on the next cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, NavError::SensorTimeout(_) | NavError::StaleData(_))
    }
}
