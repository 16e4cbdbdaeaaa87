//! # Communications interface crate.
//!
//! Provides the data structures exchanged between the navigation core and its external
//! collaborators: localisation, range sensor, contact sensor, occupancy grid provider, planning
//! service and the velocity actuator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Commands sent to the navigation core and the velocity actuator
pub mod tc;

/// Sensor data produced by equipment (scanner, bumper, grid provider)
pub mod eqpt;

mod stamped;

pub use stamped::Stamped;
