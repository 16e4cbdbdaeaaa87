//! # Telecommand module
//!
//! Commands flowing towards the robot: navigation commands for the core and velocity demands for
//! the actuator.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod nav;
pub mod vel;
