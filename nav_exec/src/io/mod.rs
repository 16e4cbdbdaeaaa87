//! # Robot IO
//!
//! Boundary traits for the robot's sensors and its velocity actuator. Every read is bounded by a
//! timeout and returns `None` if no data arrived within it, the caller must then treat its
//! decision as void rather than act on old data.
//!
//! Controllers don't read these traits directly but go through a [`SensorGate`], which converts
//! missing data into [`NavError::SensorTimeout`] and rejects samples older than ones already
//! used.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod gate;

pub use gate::SensorGate;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};

use comms_if::{
    eqpt::{contact::ContactEvent, grid::GridMsg, scan::RangeScan},
    tc::vel::VelocityCmd,
    Stamped,
};
use nalgebra::Vector2;
use serde::Serialize;

use crate::{loc::Pose2D, nav::NavError};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The independent sensor streams read by the controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SensorKind {
    Pose,
    Scan,
    Contact,
    Grid,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Provides the latest pose of the robot.
pub trait PoseSource {
    fn read_pose(&mut self, timeout: Duration) -> Option<Stamped<Pose2D>>;

    /// Transform `point` into `target_frame`.
    ///
    /// The default implementation only supports points already in the target frame.
    fn transform_point(
        &mut self,
        point: &Stamped<Vector2<f64>>,
        target_frame: &str,
    ) -> Result<Vector2<f64>, NavError> {
        if point.frame_id == target_frame {
            Ok(point.data)
        } else {
            Err(NavError::TransformUnavailable {
                from: point.frame_id.clone(),
                to: target_frame.to_string(),
            })
        }
    }
}

/// Provides planar range scans.
pub trait RangeSource {
    fn read_scan(&mut self, timeout: Duration) -> Option<Stamped<RangeScan>>;
}

/// Provides the state of the contact sensors.
pub trait ContactSource {
    fn read_contact(&mut self, timeout: Duration) -> Option<Stamped<ContactEvent>>;
}

/// Provides the latest occupancy grid.
pub trait GridSource {
    fn read_grid(&mut self, timeout: Duration) -> Option<Stamped<GridMsg>>;
}

/// Write-only channel to the velocity actuator.
pub trait VelocitySink {
    fn send(&mut self, cmd: VelocityCmd);

    /// Hold `cmd` for `duration`, repeating it every `period`.
    fn send_for(&mut self, cmd: VelocityCmd, duration: Duration, period: Duration) {
        let start = Instant::now();
        while start.elapsed() < duration {
            self.send(cmd);
            std::thread::sleep(period);
        }
    }
}

/// Everything the controllers need from the robot.
pub trait RobotIo: PoseSource + RangeSource + ContactSource + GridSource + VelocitySink {}

impl<T> RobotIo for T where T: PoseSource + RangeSource + ContactSource + GridSource + VelocitySink {}
