//! # Simulator
//!
//! A kinematic simulation of the robot and of the planning service, used by the executable and by
//! the scenario tests.
//!
//! [`SimRobot`] and [`SimPlanner`] share one [`SimWorld`], so that goals completed by the planner
//! move the same robot the controllers are driving. The world keeps its own clock which only
//! advances when the robot is commanded, so simulations run as fast as the host allows and are
//! fully deterministic.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod planner;
mod robot;
mod world;

pub use planner::SimPlanner;
pub use robot::{SentCmd, SimRobot};
pub use world::{SimParams, SimWorld};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, rc::Rc};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a new simulation from the given parameters.
pub fn simulation(params: &SimParams) -> (SimRobot, SimPlanner) {
    from_world(SimWorld::new(params.clone()))
}

/// Build a simulation around an existing world.
pub fn from_world(world: SimWorld) -> (SimRobot, SimPlanner) {
    let world = Rc::new(RefCell::new(world));
    (SimRobot::new(world.clone()), SimPlanner::new(world))
}
