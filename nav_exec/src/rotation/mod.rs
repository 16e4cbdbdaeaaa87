//! # Rotation controller
//!
//! Turns the robot on the spot by a requested angle. The heading is sampled after every command
//! and the change since the previous sample is accumulated using the shortest signed difference,
//! so crossing the +/-pi boundary adds the short way round rather than a near 2*pi jump. Rotations
//! of exactly pi, or of a full turn, therefore terminate like any other.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tc::vel::VelocityCmd;
use log::{debug, info};
use std::f64::consts::TAU;

use crate::{io::RobotIo, io::SensorGate, nav::NavError, params::MovementParams};
use util::maths::{ang_diff, sign_or_pos};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Closed-loop heading change.
#[derive(Debug, Clone, Copy)]
pub struct RotationController {
    /// Turn rate used for all rotations
    ///
    /// Units: radians/second
    velocity_rads: f64,

    /// Rotation stops once within this of the target
    ///
    /// Units: radians
    tolerance_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RotationController {
    pub fn new(params: &MovementParams) -> Self {
        Self {
            velocity_rads: params.rotation_velocity_rads.abs(),
            tolerance_rad: params.rotation_tolerance_rad.abs(),
        }
    }

    /// Rotate by `target_rad`, positive to the left.
    ///
    /// Any magnitude is accepted, values beyond pi turn more than half way round. Returns the
    /// accumulated rotation. The robot is stopped when the rotation ends, including when a pose
    /// read fails part way through.
    pub fn rotate_by<R: RobotIo>(
        &self,
        gate: &mut SensorGate<R>,
        target_rad: f64,
    ) -> Result<f64, NavError> {
        let goal_rad = target_rad.abs() - self.tolerance_rad;
        if goal_rad <= 0.0 {
            debug!("Rotation of {:.3} rad is within tolerance", target_rad);
            return Ok(0.0);
        }

        info!("Rotating by {:.3} rad", target_rad);

        let dir = sign_or_pos(target_rad);
        let cmd = VelocityCmd::point_turn(dir * self.velocity_rads);

        let mut last_rad = gate.pose()?.data.heading_rad;
        let mut sum_rad = 0.0;

        while dir * sum_rad < goal_rad {
            gate.send(cmd);

            let heading_rad = match gate.pose() {
                Ok(p) => p.data.heading_rad,
                Err(e) => {
                    gate.send(VelocityCmd::stop());
                    return Err(e);
                }
            };

            sum_rad += ang_diff(last_rad, heading_rad);
            last_rad = heading_rad;
        }

        gate.send(VelocityCmd::stop());
        debug!("Rotation complete, turned {:.3} rad", sum_rad);

        Ok(sum_rad)
    }

    /// Rotate from heading `from_rad` to heading `to_rad` the short way round.
    pub fn rotate_from_to<R: RobotIo>(
        &self,
        gate: &mut SensorGate<R>,
        from_rad: f64,
        to_rad: f64,
    ) -> Result<f64, NavError> {
        let rotation = ang_diff(from_rad, to_rad);
        info!(
            "Rotation from {:.1} deg to {:.1} deg",
            from_rad.to_degrees(),
            to_rad.to_degrees()
        );
        self.rotate_by(gate, rotation)
    }

    /// Turn once about the robot's own axis, to the left if the current heading is zero or
    /// positive and to the right otherwise.
    pub fn one_rotation<R: RobotIo>(&self, gate: &mut SensorGate<R>) -> Result<f64, NavError> {
        let heading_rad = gate.pose()?.data.heading_rad;
        self.rotate_by(gate, sign_or_pos(heading_rad) * TAU)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{simulation, SimParams, SimRobot};
    use std::f64::consts::PI;

    fn gate_at(heading_rad: f64) -> SensorGate<SimRobot> {
        let (robot, _) = simulation(&SimParams {
            start_pose: [5.0, 1.5, heading_rad],
            ..SimParams::default()
        });
        SensorGate::new(robot, 1.0, 0.1)
    }

    fn rotation() -> RotationController {
        RotationController::new(&MovementParams::default())
    }

    #[test]
    fn test_rotate_across_boundary() {
        let mut gate = gate_at(3.0);

        let turned = rotation().rotate_by(&mut gate, 1.0).unwrap();

        assert!(turned >= 1.0 - 0.05);
        assert!(turned < 1.0 + 0.05);

        // Ended up the other side of the boundary
        let h = gate.io().pose().heading_rad;
        assert!((ang_diff(3.0 + turned, h)).abs() < 1e-9);
        assert!(h < 0.0);

        // Last command is a stop
        assert_eq!(gate.io().sent.last().unwrap().cmd(), VelocityCmd::stop());
    }

    #[test]
    fn test_rotate_pi_terminates() {
        for start in &[0.0, 1.0, -2.5, PI] {
            for target in &[PI, -PI, 0.5 * PI, -0.1] {
                let mut gate = gate_at(*start);
                let turned = rotation().rotate_by(&mut gate, *target).unwrap();

                assert_eq!(sign_or_pos(turned), sign_or_pos(*target));
                assert!(turned.abs() >= target.abs() - 0.05);
                assert!(turned.abs() < target.abs() + 0.05);
            }
        }
    }

    #[test]
    fn test_within_tolerance() {
        let mut gate = gate_at(0.0);
        assert_eq!(rotation().rotate_by(&mut gate, 0.04).unwrap(), 0.0);
        assert!(gate.io().sent.is_empty());
    }

    #[test]
    fn test_one_rotation() {
        let mut gate = gate_at(-0.5);
        let turned = rotation().one_rotation(&mut gate).unwrap();

        // Negative heading turns to the right
        assert!(turned < -TAU + 0.1);
        assert!(turned > -TAU - 0.05);
    }

    #[test]
    fn test_rotate_from_to() {
        let mut gate = gate_at(3.0);
        let turned = rotation().rotate_from_to(&mut gate, 3.0, -3.0).unwrap();

        // Short way is positive, across the boundary
        assert!(turned > 0.0);
        assert!((turned - (TAU - 6.0)).abs() < 0.05);
    }

    #[test]
    fn test_pose_timeout() {
        let mut gate = gate_at(0.0);
        gate.io_mut().pose_dropouts = 1;

        let r = rotation().rotate_by(&mut gate, 1.0);

        assert!(matches!(r, Err(NavError::SensorTimeout(_))));
        assert!(gate.io().sent.is_empty());
    }
}
