//! # Simulated robot

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
    time::Duration,
};

use comms_if::{
    eqpt::{contact::ContactEvent, grid::GridMsg, scan::RangeScan},
    tc::vel::VelocityCmd,
    Stamped,
};
use serde::Serialize;

use super::SimWorld;
use crate::{
    io::{ContactSource, GridSource, PoseSource, RangeSource, VelocitySink},
    loc::Pose2D,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The simulated robot, providing every sensor and the velocity actuator.
pub struct SimRobot {
    world: Rc<RefCell<SimWorld>>,

    /// Every command received, in order
    pub sent: Vec<SentCmd>,

    /// Number of upcoming pose reads which will time out
    pub pose_dropouts: usize,

    /// Number of upcoming grid reads which will time out
    pub grid_dropouts: usize,

    /// Number of upcoming scan reads which will time out
    pub scan_dropouts: usize,

    /// Contact state reported instead of the simulated one
    pub forced_contact: Option<ContactEvent>,
}

/// A command received by the simulated robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentCmd {
    pub linear_ms: f64,
    pub angular_rads: f64,

    /// How long the command was held for
    ///
    /// Units: seconds
    pub duration_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimRobot {
    pub(super) fn new(world: Rc<RefCell<SimWorld>>) -> Self {
        Self {
            world,
            sent: Vec::new(),
            pose_dropouts: 0,
            grid_dropouts: 0,
            scan_dropouts: 0,
            forced_contact: None,
        }
    }

    pub fn world(&self) -> Ref<SimWorld> {
        self.world.borrow()
    }

    pub fn world_mut(&self) -> RefMut<SimWorld> {
        self.world.borrow_mut()
    }

    /// Current pose of the robot.
    pub fn pose(&self) -> Pose2D {
        self.world.borrow().pose
    }

    fn record(&mut self, cmd: VelocityCmd, duration_s: f64) {
        self.sent.push(SentCmd {
            linear_ms: cmd.linear_ms,
            angular_rads: cmd.angular_rads,
            duration_s,
        });
    }
}

impl SentCmd {
    pub fn cmd(&self) -> VelocityCmd {
        VelocityCmd::new(self.linear_ms, self.angular_rads)
    }
}

impl PoseSource for SimRobot {
    fn read_pose(&mut self, _timeout: Duration) -> Option<Stamped<Pose2D>> {
        if self.pose_dropouts > 0 {
            self.pose_dropouts -= 1;
            return None;
        }

        let world = self.world.borrow();
        Some(world.stamp(world.pose))
    }
}

impl RangeSource for SimRobot {
    fn read_scan(&mut self, _timeout: Duration) -> Option<Stamped<RangeScan>> {
        if self.scan_dropouts > 0 {
            self.scan_dropouts -= 1;
            return None;
        }

        let world = self.world.borrow();
        Some(world.stamp(world.scan()))
    }
}

impl ContactSource for SimRobot {
    fn read_contact(&mut self, _timeout: Duration) -> Option<Stamped<ContactEvent>> {
        let world = self.world.borrow();
        let event = match (self.forced_contact, world.contact) {
            (Some(e), _) => e,
            (None, Some(b)) => ContactEvent::pressed(b),
            (None, None) => ContactEvent::released(),
        };
        Some(world.stamp(event))
    }
}

impl GridSource for SimRobot {
    fn read_grid(&mut self, _timeout: Duration) -> Option<Stamped<GridMsg>> {
        if self.grid_dropouts > 0 {
            self.grid_dropouts -= 1;
            return None;
        }

        let world = self.world.borrow();
        Some(world.stamp(world.costmap.to_msg()))
    }
}

impl VelocitySink for SimRobot {
    fn send(&mut self, cmd: VelocityCmd) {
        let dt = {
            let mut world = self.world.borrow_mut();
            let dt = world.params.step_period_s;
            world.step(&cmd, dt);
            dt
        };
        self.record(cmd, dt);
    }

    /// Integrates the held command in steps of the simulation period, without waiting in real
    /// time.
    fn send_for(&mut self, cmd: VelocityCmd, duration: Duration, _period: Duration) {
        let duration_s = duration.as_secs_f64();
        {
            let mut world = self.world.borrow_mut();
            let dt = world.params.step_period_s;
            let mut t = 0.0;
            while t < duration_s - 1e-9 {
                let step = dt.min(duration_s - t);
                world.step(&cmd, step);
                t += step;
            }
        }
        self.record(cmd, duration_s);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{simulation, SimParams};

    #[test]
    fn test_send_for() {
        let (mut robot, _) = simulation(&SimParams {
            obstacles: vec![],
            ..SimParams::default()
        });

        robot.send_for(
            VelocityCmd::straight(-0.2),
            Duration::from_secs_f64(1.0),
            Duration::from_millis(100),
        );

        assert_eq!(robot.sent.len(), 1);
        assert_eq!(robot.sent[0].cmd(), VelocityCmd::straight(-0.2));
        assert_eq!(robot.sent[0].duration_s, 1.0);
        assert!((robot.pose().position_m.x - 0.8).abs() < 1e-9);
        assert!((robot.world().time_s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dropouts() {
        let (mut robot, _) = simulation(&SimParams::default());
        robot.pose_dropouts = 1;

        assert!(robot.read_pose(Duration::from_secs(1)).is_none());
        assert!(robot.read_pose(Duration::from_secs(1)).is_some());
    }
}
