//! # Goal backtracking
//!
//! When the costmap around an active goal becomes occupied the goal is moved back along the route
//! towards the robot, a fixed number of waypoints at a time, until a waypoint with a clear
//! footprint is found.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use super::{overlaps, NavError};
use crate::{
    io::{RobotIo, SensorGate},
    loc::{heading_of, Pose2D},
    params::MovementParams,
    plan::{PlanningService, Route},
};
use util::time::seconds_to_std;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Finds a replacement for a goal which has become occupied.
#[derive(Debug, Clone)]
pub struct GoalBacktracker {
    path_back_interval: usize,
    path_retry_limit: usize,
    path_retry_interval_s: f64,
    costmap_margin_m: f64,
    lookback: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GoalBacktracker {
    pub fn new(params: &MovementParams) -> Self {
        Self {
            path_back_interval: params.path_back_interval.max(1),
            path_retry_limit: params.path_retry_limit.max(1),
            path_retry_interval_s: params.path_retry_interval_s,
            costmap_margin_m: params.costmap_margin_m,
            lookback: params.route_direction_lookback,
        }
    }

    /// Find a clear goal before `failed_goal` on the route from the robot's current pose.
    ///
    /// Returns `Ok(None)` if every candidate waypoint overlaps the costmap, and
    /// `Err(NavError::PathUnavailable)` if no route could be obtained within the retry limit.
    pub fn try_backtrack<R: RobotIo, P: PlanningService>(
        &self,
        gate: &mut SensorGate<R>,
        planner: &mut P,
        failed_goal: &Pose2D,
    ) -> Result<Option<Pose2D>, NavError> {
        let pose = gate.pose()?.data;
        let route = self.request_route(planner, &pose, failed_goal)?;
        let grid = gate.grid()?.data;

        let last = route.len() - 1;
        let mut i = 1;

        while i * self.path_back_interval <= last {
            let idx = last - i * self.path_back_interval;
            i += 1;

            let wp = match route.get(idx) {
                Some(wp) => *wp,
                None => break,
            };

            if overlaps(&wp, &grid, self.costmap_margin_m) {
                debug!("Backtrack waypoint {} is occupied", idx);
                continue;
            }

            let direction = planner
                .route_direction(&pose, &wp, Some(&route.truncated(idx)), self.lookback)
                .unwrap_or_else(|| pose.vector_to(&wp.position_m));

            let goal = Pose2D {
                position_m: wp.position_m,
                heading_rad: heading_of(&direction).unwrap_or(wp.heading_rad),
            };

            info!(
                "Backtracked to waypoint {} of {}: ({:.2}, {:.2})",
                idx,
                last,
                goal.position_m.x,
                goal.position_m.y
            );
            return Ok(Some(goal));
        }

        warn!("No clear waypoint found on the route to the occupied goal");
        Ok(None)
    }

    /// Request a non-empty route, retrying at the configured interval.
    fn request_route<P: PlanningService>(
        &self,
        planner: &mut P,
        start: &Pose2D,
        goal: &Pose2D,
    ) -> Result<Route, NavError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match planner.create_route(start, goal) {
                Some(r) if !r.is_empty() => return Ok(r),
                _ => warn!("No route to the occupied goal (attempt {})", attempts),
            }

            if attempts >= self.path_retry_limit {
                return Err(NavError::PathUnavailable { attempts });
            }

            std::thread::sleep(seconds_to_std(self.path_retry_interval_s));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{simulation, SimParams, SimPlanner, SimRobot};

    fn setup(obstacle: [f64; 4]) -> (SensorGate<SimRobot>, SimPlanner) {
        let (robot, planner) = simulation(&SimParams {
            obstacles: vec![obstacle],
            start_pose: [1.0, 5.0, 0.0],
            ..SimParams::default()
        });
        (SensorGate::new(robot, 1.0, 0.1), planner)
    }

    #[test]
    fn test_backtrack_to_clear_waypoint() {
        let (mut gate, mut planner) = setup([3.0, 4.8, 3.2, 5.2]);
        let bt = GoalBacktracker::new(&MovementParams::fast());

        // 23 waypoint route, index 17 is within the inflation so index 12 is chosen
        let goal = bt
            .try_backtrack(&mut gate, &mut planner, &Pose2D::new(3.13, 5.0, 1.0))
            .unwrap()
            .unwrap();

        assert!((goal.position_m.x - (1.0 + 2.13 * 12.0 / 22.0)).abs() < 1e-9);
        assert!((goal.position_m.y - 5.0).abs() < 1e-9);
        assert!(goal.heading_rad.abs() < 1e-9);
    }

    #[test]
    fn test_backtrack_first_hop() {
        let (mut gate, mut planner) = setup([3.4, 5.8, 3.6, 6.2]);
        let params = MovementParams::fast();
        let bt = GoalBacktracker::new(&params);

        let failed = Pose2D::new(3.13, 6.0, 1.0);
        let grid = gate.grid().unwrap().data;
        assert!(overlaps(&failed, &grid, params.costmap_margin_m));

        // 25 waypoint route, index 19 is one hop back and already clear
        let goal = bt
            .try_backtrack(&mut gate, &mut planner, &failed)
            .unwrap()
            .unwrap();

        assert!((goal.position_m.x - (1.0 + 2.13 * 19.0 / 24.0)).abs() < 1e-9);
        assert!((goal.position_m.y - (5.0 + 19.0 / 24.0)).abs() < 1e-9);
        assert!((goal.heading_rad - 1.0f64.atan2(2.13)).abs() < 1e-9);
    }

    #[test]
    fn test_backtrack_all_occupied() {
        let (mut gate, mut planner) = setup([1.4, 3.0, 3.0, 7.0]);
        let bt = GoalBacktracker::new(&MovementParams::fast());

        let goal = bt
            .try_backtrack(&mut gate, &mut planner, &Pose2D::new(2.47, 5.0, 0.0))
            .unwrap();

        assert_eq!(goal, None);
    }

    #[test]
    fn test_route_retries() {
        let (mut gate, mut planner) = setup([3.0, 4.8, 3.2, 5.2]);
        let bt = GoalBacktracker::new(&MovementParams {
            path_retry_limit: 3,
            ..MovementParams::fast()
        });

        // Two failures are retried through
        planner.route_failures = 2;
        assert!(bt
            .try_backtrack(&mut gate, &mut planner, &Pose2D::new(3.1, 5.0, 0.0))
            .unwrap()
            .is_some());
        assert_eq!(planner.route_failures, 0);

        // Persistent failures give up after the limit
        planner.route_failures = 10;
        match bt.try_backtrack(&mut gate, &mut planner, &Pose2D::new(3.1, 5.0, 0.0)) {
            Err(NavError::PathUnavailable { attempts }) => assert_eq!(attempts, 3),
            r => panic!("Expected PathUnavailable, got {:?}", r),
        }
        assert_eq!(planner.route_failures, 7);
    }
}
