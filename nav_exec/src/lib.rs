//! # Navigation library.
//!
//! Reactive motion control for a mobile ground robot. Given a goal or a "keep moving forward"
//! directive the library produces velocity commands which get the robot there while avoiding
//! collisions, escaping occupied terrain and recovering from contact or dead ends.
//!
//! The binary in this crate runs the controllers against the kinematic simulator in [`sim`], other
//! hosts provide their own implementations of the boundary traits in [`io`] and [`plan`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Reactive obstacle avoidance from range scan and contact data
pub mod avoid;

/// Goal decision strategies - choose where the robot should go next
pub mod goal_decision;

/// Boundary traits for the robot's sensors and actuator, plus freshness checking
pub mod io;

/// Localisation types - poses of the robot and its goals
pub mod loc;

/// Hysteresis state carried between control ticks
pub mod memory;

/// Occupancy grid and search window types
pub mod map;

/// Top level movement controller combining all other modules
pub mod movement;

/// Costmap navigation - collision checking, escape, backtracking and goal navigation
pub mod nav;

/// Parameters for the navigation executable
pub mod params;

/// Boundary trait for the external planning service
pub mod plan;

/// Closed-loop heading changes
pub mod rotation;

/// Kinematic simulator providing every boundary trait
pub mod sim;
