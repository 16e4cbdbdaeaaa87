//! # Sensor gate

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::HashMap, convert::TryFrom, time::Duration};

use chrono::{DateTime, Utc};
use comms_if::{
    eqpt::{contact::ContactEvent, scan::RangeScan},
    tc::vel::VelocityCmd,
    Stamped,
};
use log::{info, trace};
use nalgebra::Vector2;

use super::{RobotIo, SensorKind};
use crate::{loc::Pose2D, map::OccupancyGrid, nav::NavError};
use util::time::seconds_to_std;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Wraps the robot's IO, bounding every read with the sensor timeout and making sure no sample is
/// older than one already used.
pub struct SensorGate<R> {
    io: R,

    timeout: Duration,

    command_period: Duration,

    /// Stamp of the newest sample used from each sensor
    newest: HashMap<SensorKind, DateTime<Utc>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<R: RobotIo> SensorGate<R> {
    pub fn new(io: R, sensor_timeout_s: f64, command_period_s: f64) -> Self {
        Self {
            io,
            timeout: seconds_to_std(sensor_timeout_s),
            command_period: seconds_to_std(command_period_s),
            newest: HashMap::new(),
        }
    }

    pub fn io(&self) -> &R {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut R {
        &mut self.io
    }

    pub fn into_inner(self) -> R {
        self.io
    }

    /// Read the robot's pose.
    pub fn pose(&mut self) -> Result<Stamped<Pose2D>, NavError> {
        let timeout = self.timeout;
        let pose = self.io.read_pose(timeout);
        self.accept(SensorKind::Pose, pose)
    }

    /// Read a range scan.
    pub fn scan(&mut self) -> Result<Stamped<RangeScan>, NavError> {
        let timeout = self.timeout;
        let scan = self.io.read_scan(timeout);
        self.accept(SensorKind::Scan, scan)
    }

    /// Read the contact sensor state.
    pub fn contact(&mut self) -> Result<Stamped<ContactEvent>, NavError> {
        let timeout = self.timeout;
        let contact = self.io.read_contact(timeout);
        self.accept(SensorKind::Contact, contact)
    }

    /// Read the occupancy grid, validating it.
    pub fn grid(&mut self) -> Result<Stamped<OccupancyGrid>, NavError> {
        let timeout = self.timeout;
        let msg = self.io.read_grid(timeout);
        let msg = self.accept(SensorKind::Grid, msg)?;

        Ok(Stamped {
            stamp: msg.stamp,
            frame_id: msg.frame_id,
            data: OccupancyGrid::try_from(msg.data)?,
        })
    }

    /// Transform a point into `target_frame`.
    pub fn transform_point(
        &mut self,
        point: &Stamped<Vector2<f64>>,
        target_frame: &str,
    ) -> Result<Vector2<f64>, NavError> {
        self.io.transform_point(point, target_frame)
    }

    /// Send a single velocity command.
    pub fn send(&mut self, cmd: VelocityCmd) {
        trace!("Velocity command: {:?}", cmd);
        self.io.send(cmd);
    }

    /// Hold a velocity command for `duration_s`.
    pub fn send_for(&mut self, cmd: VelocityCmd, duration_s: f64) {
        trace!("Velocity command: {:?} for {} s", cmd, duration_s);
        let period = self.command_period;
        self.io.send_for(cmd, seconds_to_std(duration_s), period);
    }

    fn accept<T>(&mut self, kind: SensorKind, sample: Option<Stamped<T>>) -> Result<Stamped<T>, NavError> {
        let sample = match sample {
            Some(s) => s,
            None => {
                info!("Waiting for {:?} data...", kind);
                return Err(NavError::SensorTimeout(kind));
            }
        };

        if let Some(newest) = self.newest.get(&kind) {
            if sample.stamp < *newest {
                return Err(NavError::StaleData(kind));
            }
        }
        self.newest.insert(kind, sample.stamp);

        Ok(sample)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::{ContactSource, GridSource, PoseSource, RangeSource, VelocitySink};
    use comms_if::eqpt::grid::GridMsg;
    use std::collections::VecDeque;

    /// IO which replays a queue of poses and has no other sensors
    #[derive(Default)]
    struct Replay {
        poses: VecDeque<Option<Stamped<Pose2D>>>,
        sent: Vec<VelocityCmd>,
    }

    impl PoseSource for Replay {
        fn read_pose(&mut self, _: Duration) -> Option<Stamped<Pose2D>> {
            self.poses.pop_front().flatten()
        }
    }

    impl RangeSource for Replay {
        fn read_scan(&mut self, _: Duration) -> Option<Stamped<RangeScan>> {
            None
        }
    }

    impl ContactSource for Replay {
        fn read_contact(&mut self, _: Duration) -> Option<Stamped<ContactEvent>> {
            None
        }
    }

    impl GridSource for Replay {
        fn read_grid(&mut self, _: Duration) -> Option<Stamped<GridMsg>> {
            None
        }
    }

    impl VelocitySink for Replay {
        fn send(&mut self, cmd: VelocityCmd) {
            self.sent.push(cmd);
        }
    }

    fn pose_at(stamp: DateTime<Utc>) -> Option<Stamped<Pose2D>> {
        Some(Stamped {
            stamp,
            frame_id: "map".into(),
            data: Pose2D::default(),
        })
    }

    #[test]
    fn test_freshness() {
        let t0 = Utc::now();
        let mut io = Replay::default();
        io.poses.push_back(pose_at(t0));
        io.poses.push_back(pose_at(t0));
        io.poses.push_back(pose_at(t0 - chrono::Duration::milliseconds(10)));
        io.poses.push_back(None);
        io.poses.push_back(pose_at(t0 + chrono::Duration::milliseconds(10)));

        let mut gate = SensorGate::new(io, 0.0, 0.0);

        assert!(gate.pose().is_ok());
        // Same sample again is fine
        assert!(gate.pose().is_ok());
        assert!(matches!(
            gate.pose(),
            Err(NavError::StaleData(SensorKind::Pose))
        ));
        assert!(matches!(
            gate.pose(),
            Err(NavError::SensorTimeout(SensorKind::Pose))
        ));
        assert!(gate.pose().is_ok());

        // Other sensors are tracked separately
        assert!(matches!(
            gate.grid(),
            Err(NavError::SensorTimeout(SensorKind::Grid))
        ));
    }

    #[test]
    fn test_send() {
        let mut gate = SensorGate::new(Replay::default(), 0.0, 0.0);
        gate.send(VelocityCmd::stop());
        assert_eq!(gate.io().sent, vec![VelocityCmd::stop()]);
    }
}
