//! # Navigation telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command that can be performed by the navigation core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
pub enum NavCmd {
    /// Navigate to the given coordinates using the planning service.
    #[structopt(name = "goto")]
    Goto {
        /// The x-coordinate of the point to navigate to.
        x_m: f64,

        /// The y-coordinate of the point to navigate to.
        y_m: f64,

        /// The frame the coordinates are given in. Defaults to the pose source's frame.
        #[structopt(long)]
        frame: Option<String>,
    },

    /// Move forward reactively (no goal) for the given number of control ticks.
    #[structopt(name = "forward")]
    Forward {
        /// Number of ticks to run.
        ticks: usize,
    },

    /// Rotate on the spot by the given angle.
    #[structopt(name = "rotate")]
    Rotate {
        /// Angle to rotate by in radians, positive is to the left.
        #[structopt(allow_hyphen_values = true)]
        angle_rad: f64,
    },

    /// Rotate once about the robot's axis to survey the surroundings.
    #[structopt(name = "survey")]
    Survey,

    /// Visit every goal given by the goal decision strategy in turn.
    #[structopt(name = "explore")]
    Explore {
        /// Goals as a flat list of coordinates, `x0 y0 x1 y1 ...`.
        #[structopt(allow_hyphen_values = true)]
        goals: Vec<f64>,
    },
}
