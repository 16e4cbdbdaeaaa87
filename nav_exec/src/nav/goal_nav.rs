//! # Goal navigation
//!
//! Drives the robot to a goal through the external planning service. Before the goal is submitted
//! the robot is escaped from any occupied terrain it is standing on and the goal is given a
//! heading. While the goal is being worked on the costmap around it is monitored, and if it
//! becomes occupied the goal is backtracked along the route to a clear waypoint.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use comms_if::Stamped;
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;

use super::{overlaps, CostmapEscapePlanner, GoalBacktracker, NavError};
use crate::{
    io::{RobotIo, SensorGate},
    loc::{heading_of, Pose2D},
    memory::AvoidanceMemory,
    params::MovementParams,
    plan::{GoalHandle, GoalStatus, PlanningService},
};
use util::time::seconds_to_std;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time given to the planning service to come up on each wait attempt
const SERVICE_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Lifecycle of a single goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoalState {
    Idle,
    RequestSent,
    Monitoring,
    Succeeded,
    Aborted,
    Canceled,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Navigates the robot to goals via the planning service.
#[derive(Debug, Clone)]
pub struct GoalNavigator {
    state: GoalState,

    service_wait_limit: usize,
    goal_poll_period_s: f64,
    angle_bias_rad: f64,
    lookback: usize,
    costmap_margin_m: f64,

    escape: CostmapEscapePlanner,
    backtracker: GoalBacktracker,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GoalNavigator {
    pub fn new(params: &MovementParams) -> Self {
        Self {
            state: GoalState::Idle,
            service_wait_limit: params.service_wait_limit.max(1),
            goal_poll_period_s: 1.0 / params.goal_poll_rate_hz,
            angle_bias_rad: params.angle_bias_deg.to_radians(),
            lookback: params.route_direction_lookback,
            costmap_margin_m: params.costmap_margin_m,
            escape: CostmapEscapePlanner::new(params),
            backtracker: GoalBacktracker::new(params),
        }
    }

    /// State of the most recent goal.
    pub fn state(&self) -> GoalState {
        self.state
    }

    /// Navigate to `goal` and block until the planning service reports it finished.
    ///
    /// The terminal status reported by the service is returned as is, so a goal which was
    /// backtracked and then reached is `Succeeded`, and one which couldn't be backtracked is
    /// `Canceled`.
    pub fn run<R: RobotIo, P: PlanningService>(
        &mut self,
        gate: &mut SensorGate<R>,
        planner: &mut P,
        memory: &mut AvoidanceMemory,
        goal: &Stamped<Vector2<f64>>,
    ) -> Result<GoalState, NavError> {
        self.state = GoalState::Idle;

        // ---- WAIT FOR SERVICE ----

        let mut attempts = 0;
        while !planner.wait_for_server(SERVICE_WAIT_TIMEOUT) {
            attempts += 1;
            if attempts >= self.service_wait_limit {
                warn!("Planning service unavailable after {} attempts", attempts);
                return Err(NavError::ServiceUnavailable);
            }
            info!("Waiting for the planning service...");
        }

        // ---- PREPARE GOAL ----

        let mut pose = gate.pose()?;

        let goal_m = if goal.frame_id == pose.frame_id {
            goal.data
        } else {
            gate.transform_point(goal, &pose.frame_id)?
        };

        let grid = gate.grid()?.data;
        if overlaps(&pose.data, &grid, self.costmap_margin_m) {
            info!("Robot is inside the costmap, escaping before submitting the goal");
            self.escape.escape(gate, memory)?;
            pose = gate.pose()?;
        }

        let target = Pose2D {
            position_m: goal_m,
            heading_rad: pose.data.heading_rad,
        };
        let direction = planner
            .route_direction(&pose.data, &target, None, self.lookback)
            .unwrap_or_else(|| {
                debug!("No route direction available, using biased straight line");
                pose.data.biased_direction_to(&goal_m, self.angle_bias_rad)
            });

        let mut current = Pose2D {
            position_m: goal_m,
            heading_rad: heading_of(&direction).unwrap_or(pose.data.heading_rad),
        };

        let frame_id = pose.frame_id.clone();
        let mut handle = self.submit(planner, &frame_id, &current);

        // ---- MONITOR ----

        let status = loop {
            let status = planner.poll(handle);
            if status.is_done() {
                break status;
            }
            self.state = GoalState::Monitoring;

            match self.check_goal(gate, planner, &current) {
                Ok(Check::Clear) => (),
                Ok(Check::Replace(new)) => {
                    planner.cancel(handle);
                    current = new;
                    handle = self.submit(planner, &frame_id, &current);
                }
                Ok(Check::GiveUp) => {
                    warn!("Goal is occupied and can't be backtracked, cancelling");
                    planner.cancel(handle);
                    break self.wait_done(planner, handle);
                }
                Err(e) if e.is_transient() => debug!("Goal check skipped: {}", e),
                Err(e) => {
                    planner.cancel(handle);
                    self.state = GoalState::Canceled;
                    return Err(e);
                }
            }

            std::thread::sleep(seconds_to_std(self.goal_poll_period_s));
        };

        self.state = status.into();
        info!("Goal finished: {:?}", self.state);

        Ok(self.state)
    }

    fn submit<P: PlanningService>(
        &mut self,
        planner: &mut P,
        frame_id: &str,
        goal: &Pose2D,
    ) -> GoalHandle {
        info!(
            "Sending goal ({:.2}, {:.2}, {:.1} deg)",
            goal.position_m.x,
            goal.position_m.y,
            goal.heading_rad.to_degrees()
        );
        let handle = planner.submit_goal(&Stamped::now(frame_id, *goal));
        self.state = GoalState::RequestSent;
        handle
    }

    /// Check whether the active goal has become occupied, and find its replacement if so.
    fn check_goal<R: RobotIo, P: PlanningService>(
        &self,
        gate: &mut SensorGate<R>,
        planner: &mut P,
        goal: &Pose2D,
    ) -> Result<Check, NavError> {
        let grid = gate.grid()?.data;
        if !overlaps(goal, &grid, self.costmap_margin_m) {
            return Ok(Check::Clear);
        }

        info!("Goal is now occupied, backtracking");
        match self.backtracker.try_backtrack(gate, planner, goal) {
            Ok(Some(new)) => Ok(Check::Replace(new)),
            Ok(None) | Err(NavError::PathUnavailable { .. }) => Ok(Check::GiveUp),
            Err(e) => Err(e),
        }
    }

    /// Wait for a cancelled goal to finish, giving up after `service_wait_limit` polls.
    fn wait_done<P: PlanningService>(&self, planner: &mut P, handle: GoalHandle) -> GoalStatus {
        for _ in 0..self.service_wait_limit {
            let status = planner.poll(handle);
            if status.is_done() {
                return status;
            }
            std::thread::sleep(seconds_to_std(self.goal_poll_period_s));
        }

        warn!(
            "Cancelled goal still active after {} polls, treating it as cancelled",
            self.service_wait_limit
        );
        GoalStatus::Canceled
    }
}

/// Outcome of checking the active goal against the costmap.
enum Check {
    Clear,
    Replace(Pose2D),
    GiveUp,
}

impl From<GoalStatus> for GoalState {
    fn from(status: GoalStatus) -> Self {
        match status {
            GoalStatus::Pending => GoalState::RequestSent,
            GoalStatus::Active => GoalState::Monitoring,
            GoalStatus::Succeeded => GoalState::Succeeded,
            GoalStatus::Aborted => GoalState::Aborted,
            GoalStatus::Canceled => GoalState::Canceled,
        }
    }
}
