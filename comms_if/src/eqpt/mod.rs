//! # Equipment Interface
//!
//! This module defines the data produced by the robot's sensors and map provider.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod contact;
pub mod grid;
pub mod scan;
