//! # Movement
//!
//! The top level controller. Owns the robot IO, the planning service and the avoidance memory,
//! and exposes the robot's movement modes:
//! - `move_to_goal` - navigate to a goal through the planning service.
//! - `move_to_forward` - one tick of reactive forward driving without a goal.
//! - `one_rotation` / `rotate` - turn on the spot.
//! - `explore` - drive to each goal chosen by a [`GoalDecision`] strategy.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::Stamped;
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;

use crate::{
    avoid::{AvoidanceAction, ReactiveObstacleAvoider},
    goal_decision::GoalDecision,
    io::{RobotIo, SensorGate, SensorKind},
    memory::AvoidanceMemory,
    nav::{overlaps, CostmapEscapePlanner, GoalNavigator, GoalState, NavError},
    params::MovementParams,
    plan::PlanningService,
    rotation::RotationController,
};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of one forward mode tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TickOutcome {
    /// Data from this sensor wasn't available, nothing was decided
    Skipped(SensorKind),

    /// A command was sent
    Acted(AvoidanceAction),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// What happened to one goal during exploration.
#[derive(Debug, Clone, Serialize)]
pub struct GoalRecord {
    pub goal_m: Vector2<f64>,

    /// Terminal state of the goal, if it ran to completion
    pub state: Option<GoalState>,

    /// Error which stopped the goal, if any
    pub error: Option<String>,
}

/// Movement controller for a robot.
pub struct Movement<R, P> {
    gate: SensorGate<R>,
    planner: P,
    memory: AvoidanceMemory,

    params: MovementParams,

    avoider: ReactiveObstacleAvoider,
    rotation: RotationController,
    escape: CostmapEscapePlanner,
    navigator: GoalNavigator,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<R: RobotIo, P: PlanningService> Movement<R, P> {
    pub fn new(io: R, planner: P, params: &MovementParams) -> Self {
        Self {
            gate: SensorGate::new(io, params.sensor_timeout_s, params.command_period_s),
            planner,
            memory: AvoidanceMemory::default(),
            params: params.clone(),
            avoider: ReactiveObstacleAvoider::new(params),
            rotation: RotationController::new(params),
            escape: CostmapEscapePlanner::new(params),
            navigator: GoalNavigator::new(params),
        }
    }

    pub fn memory(&self) -> &AvoidanceMemory {
        &self.memory
    }

    pub fn io(&self) -> &R {
        self.gate.io()
    }

    pub fn io_mut(&mut self) -> &mut R {
        self.gate.io_mut()
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut P {
        &mut self.planner
    }

    /// Navigate to `goal`, blocking until the planning service reports it finished.
    pub fn move_to_goal(&mut self, goal: &Stamped<Vector2<f64>>) -> Result<GoalState, NavError> {
        info!("Moving to goal ({:.2}, {:.2})", goal.data.x, goal.data.y);
        self.navigator
            .run(&mut self.gate, &mut self.planner, &mut self.memory, goal)
    }

    /// Run one tick of forward driving.
    ///
    /// A pressed bumper reverses the robot before any other sensor is read. Otherwise missing or
    /// stale sensor data skips the tick without sending anything, except that an escape already
    /// under way runs to completion first.
    pub fn move_to_forward(&mut self) -> Result<TickOutcome, NavError> {
        debug!("Moving straight, previous side {:?}", self.memory.avoidance_sign);

        let contact = match self.gate.contact() {
            Ok(c) => c.data,
            Err(e) => return skipped(e),
        };

        if let Some(reflex) = self.avoider.contact_reflex(&contact) {
            self.avoider.apply(&mut self.gate, &reflex);
            return Ok(TickOutcome::Acted(reflex.action));
        }

        let pose = match self.gate.pose() {
            Ok(p) => p.data,
            Err(e) => return skipped(e),
        };

        let grid = match self.gate.grid() {
            Ok(g) => g.data,
            Err(e) => return skipped(e),
        };

        if overlaps(&pose, &grid, self.params.costmap_margin_m) {
            if let Err(e) = self.escape.escape(&mut self.gate, &mut self.memory) {
                return skipped(e);
            }
        }

        let scan = match self.gate.scan() {
            Ok(s) => s.data,
            Err(e) => return skipped(e),
        };

        let decision = self.avoider.decide(&scan, &contact, &mut self.memory);
        self.avoider.apply(&mut self.gate, &decision);

        Ok(TickOutcome::Acted(decision.action))
    }

    /// Turn once on the spot.
    pub fn one_rotation(&mut self) -> Result<f64, NavError> {
        self.rotation.one_rotation(&mut self.gate)
    }

    /// Turn on the spot by `angle_rad`, positive to the left.
    pub fn rotate(&mut self, angle_rad: f64) -> Result<f64, NavError> {
        self.rotation.rotate_by(&mut self.gate, angle_rad)
    }

    /// Turn on the spot from one heading to another the short way round.
    pub fn rotate_from_to(&mut self, from_rad: f64, to_rad: f64) -> Result<f64, NavError> {
        self.rotation.rotate_from_to(&mut self.gate, from_rad, to_rad)
    }

    /// Drive to every goal the strategy gives until it has none left.
    ///
    /// If `survey` is set the robot turns once on the spot before the first goal. A goal which
    /// fails with an error is recorded and exploration moves on to the next one.
    pub fn explore(
        &mut self,
        decision: &mut dyn GoalDecision,
        survey: bool,
    ) -> Result<Vec<GoalRecord>, NavError> {
        if survey {
            info!("Survey rotation");
            if let Err(e) = self.one_rotation() {
                warn!("Survey rotation failed: {}", e);
            }
        }

        let mut records = Vec::new();

        loop {
            let pose = self.gate.pose()?;

            let goal = match decision.decide_goal(&pose) {
                Some(g) => g,
                None => break,
            };

            let record = match self.move_to_goal(&goal) {
                Ok(state) => GoalRecord {
                    goal_m: goal.data,
                    state: Some(state),
                    error: None,
                },
                Err(e) => {
                    warn!("Goal ({:.2}, {:.2}) failed: {}", goal.data.x, goal.data.y, e);
                    GoalRecord {
                        goal_m: goal.data,
                        state: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            records.push(record);
        }

        info!("Exploration finished after {} goals", records.len());
        Ok(records)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Turn a transient sensor error into a skipped tick, passing other errors on.
fn skipped(e: NavError) -> Result<TickOutcome, NavError> {
    match e {
        NavError::SensorTimeout(kind) | NavError::StaleData(kind) => {
            debug!("Tick skipped: {}", e);
            Ok(TickOutcome::Skipped(kind))
        }
        e => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        goal_decision::{WaypointQueue, WaypointQueueParams},
        sim::{simulation, SimParams, SimPlanner, SimRobot},
    };
    use comms_if::eqpt::contact::{Bumper, ContactEvent};

    fn movement(params: SimParams) -> Movement<SimRobot, SimPlanner> {
        let (robot, planner) = simulation(&params);
        Movement::new(robot, planner, &MovementParams::fast())
    }

    #[test]
    fn test_forward_tick() {
        let mut m = movement(SimParams::default());

        let outcome = m.move_to_forward().unwrap();
        assert!(matches!(outcome, TickOutcome::Acted(_)));
        assert_eq!(m.io().sent.len(), 1);
        assert!(m.io().pose().position_m.x > 1.0);
    }

    #[test]
    fn test_forward_tick_skipped() {
        let mut m = movement(SimParams::default());

        m.io_mut().pose_dropouts = 1;
        assert_eq!(
            m.move_to_forward().unwrap(),
            TickOutcome::Skipped(SensorKind::Pose)
        );

        m.io_mut().grid_dropouts = 1;
        assert_eq!(
            m.move_to_forward().unwrap(),
            TickOutcome::Skipped(SensorKind::Grid)
        );

        assert!(m.io().sent.is_empty());
    }

    #[test]
    fn test_forward_contact_reflex() {
        let mut m = movement(SimParams::default());
        m.io_mut().forced_contact = Some(ContactEvent::pressed(Bumper::Centre));

        let outcome = m.move_to_forward().unwrap();
        assert_eq!(outcome, TickOutcome::Acted(AvoidanceAction::ContactReverse));

        let sent = m.io().sent[0];
        assert_eq!(sent.linear_ms, -0.2);
        assert_eq!(sent.angular_rads, 0.0);
        assert_eq!(sent.duration_s, 1.0);
        assert!((m.io().pose().position_m.x - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_contact_reflex_without_scan() {
        let mut m = movement(SimParams::default());
        m.io_mut().scan_dropouts = 2;

        assert_eq!(
            m.move_to_forward().unwrap(),
            TickOutcome::Skipped(SensorKind::Scan)
        );
        assert!(m.io().sent.is_empty());

        // Bumper pressed while the scanner is still silent
        m.io_mut().forced_contact = Some(ContactEvent::pressed(Bumper::Centre));
        assert_eq!(
            m.move_to_forward().unwrap(),
            TickOutcome::Acted(AvoidanceAction::ContactReverse)
        );
        assert_eq!(m.io().sent.len(), 1);
        assert_eq!(m.io().sent[0].linear_ms, -0.2);
        assert_eq!(m.io().sent[0].duration_s, 1.0);
        assert_eq!(m.io().scan_dropouts, 1);
    }

    #[test]
    fn test_forward_escapes_first() {
        let mut m = movement(SimParams {
            obstacles: vec![[1.0, 0.0, 1.2, 3.0]],
            border_walls: false,
            start_pose: [1.45, 1.5, std::f64::consts::PI],
            ..SimParams::default()
        });

        let outcome = m.move_to_forward().unwrap();
        assert!(matches!(outcome, TickOutcome::Acted(_)));
        assert!(m.memory().last_escape_sector.is_some());
        assert!(m.io().pose().position_m.x > 1.45);
    }

    #[test]
    fn test_forward_drive_many_ticks() {
        let mut m = movement(SimParams::default());

        for _ in 0..50 {
            match m.move_to_forward().unwrap() {
                TickOutcome::Acted(_) => (),
                o => panic!("Unexpected outcome {:?}", o),
            }
        }

        assert_eq!(m.io().sent.len(), 50);
        assert!(m.io().sent.iter().all(|s| s.linear_ms > 0.0));
        assert_eq!(m.io().world().contact, None);
    }

    #[test]
    fn test_rotate() {
        let mut m = movement(SimParams::default());

        let turned = m.rotate(std::f64::consts::FRAC_PI_2).unwrap();
        assert!(turned >= std::f64::consts::FRAC_PI_2 - 0.05);
        assert!((m.io().pose().heading_rad - turned).abs() < 1e-9);
    }

    #[test]
    fn test_explore() {
        let mut m = movement(SimParams::default());
        let mut queue = WaypointQueue::from_flat(
            WaypointQueueParams::default(),
            "map",
            &[2.0, 5.0, 2.0, 8.0],
        );

        let records = m.explore(&mut queue, true).unwrap();

        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.state == Some(GoalState::Succeeded)));
        assert_eq!(m.planner().submitted.len(), 2);
        assert!((m.io().pose().position_m - Vector2::new(2.0, 8.0)).norm() < 1e-9);

        // Survey turned the robot before the first goal
        assert!(m.io().sent.iter().any(|s| s.angular_rads != 0.0));
    }
}
