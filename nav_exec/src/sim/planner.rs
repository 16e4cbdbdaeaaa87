//! # Simulated planning service
//!
//! Routes are straight lines sampled at a fixed separation. While a goal is active each poll moves
//! the robot a few waypoints along its route, aborting if the next waypoint is inside an obstacle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, collections::HashMap, rc::Rc, time::Duration};

use comms_if::Stamped;
use log::{debug, warn};

use super::SimWorld;
use crate::{
    loc::Pose2D,
    plan::{GoalHandle, GoalStatus, PlanningService, Route},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The simulated planning service.
pub struct SimPlanner {
    world: Rc<RefCell<SimWorld>>,

    /// Number of upcoming server waits which will report the server as unavailable
    pub server_unavailable_for: usize,

    /// Number of upcoming route requests which will fail
    pub route_failures: usize,

    /// Every goal submitted, in order
    pub submitted: Vec<Pose2D>,

    /// Number of cancellations received
    pub cancel_count: usize,

    /// Cancelled goals never finish, staying active without moving the robot
    pub hang_on_cancel: bool,

    goals: HashMap<GoalHandle, SimGoal>,

    next_id: u64,
}

struct SimGoal {
    route: Route,

    /// Index of the next waypoint to drive to
    next: usize,

    status: GoalStatus,

    hung: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimPlanner {
    pub(super) fn new(world: Rc<RefCell<SimWorld>>) -> Self {
        Self {
            world,
            server_unavailable_for: 0,
            route_failures: 0,
            submitted: Vec::new(),
            cancel_count: 0,
            hang_on_cancel: false,
            goals: HashMap::new(),
            next_id: 0,
        }
    }

    /// Straight line route between two poses.
    fn straight_route(&self, start: &Pose2D, goal: &Pose2D) -> Route {
        let sep = self.world.borrow().params.route_separation_m;
        let delta = goal.position_m - start.position_m;
        let n = ((delta.norm() / sep).ceil() as usize).max(1);

        let heading = crate::loc::heading_of(&delta).unwrap_or(goal.heading_rad);

        let mut poses: Vec<Pose2D> = (0..n)
            .map(|i| Pose2D {
                position_m: start.position_m + delta * (i as f64 / n as f64),
                heading_rad: heading,
            })
            .collect();
        poses.push(*goal);

        Route::new(poses)
    }

    /// Drive the robot along the goal's route for one poll.
    fn advance(world: &mut SimWorld, goal: &mut SimGoal) {
        let dt = world.params.step_period_s;

        for _ in 0..world.params.waypoints_per_poll {
            let wp = match goal.route.get(goal.next) {
                Some(wp) => *wp,
                None => break,
            };

            if world.is_blocked_at(&wp.position_m) {
                warn!("Sim planner blocked at {:?}", wp.position_m);
                goal.status = GoalStatus::Aborted;
                return;
            }

            world.pose = wp;
            world.wait(dt);
            goal.next += 1;
        }

        if goal.next >= goal.route.len() {
            goal.status = GoalStatus::Succeeded;
        }
    }
}

impl PlanningService for SimPlanner {
    fn wait_for_server(&mut self, _timeout: Duration) -> bool {
        if self.server_unavailable_for > 0 {
            self.server_unavailable_for -= 1;
            false
        } else {
            true
        }
    }

    fn create_route(&mut self, start: &Pose2D, goal: &Pose2D) -> Option<Route> {
        if self.route_failures > 0 {
            self.route_failures -= 1;
            return None;
        }

        Some(self.straight_route(start, goal))
    }

    fn submit_goal(&mut self, goal: &Stamped<Pose2D>) -> GoalHandle {
        let start = self.world.borrow().pose;
        let route = self.straight_route(&start, &goal.data);

        let handle = GoalHandle(self.next_id);
        self.next_id += 1;

        debug!(
            "Sim planner accepted goal {:?} with {} waypoints",
            handle,
            route.len()
        );

        self.submitted.push(goal.data);
        self.goals.insert(
            handle,
            SimGoal {
                route,
                next: 0,
                status: GoalStatus::Pending,
                hung: false,
            },
        );

        handle
    }

    fn poll(&mut self, handle: GoalHandle) -> GoalStatus {
        let goal = match self.goals.get_mut(&handle) {
            Some(g) => g,
            None => return GoalStatus::Aborted,
        };

        if goal.hung {
            return GoalStatus::Active;
        }

        match goal.status {
            GoalStatus::Pending => goal.status = GoalStatus::Active,
            GoalStatus::Active => Self::advance(&mut self.world.borrow_mut(), goal),
            _ => (),
        }

        goal.status
    }

    fn cancel(&mut self, handle: GoalHandle) {
        self.cancel_count += 1;
        let hang = self.hang_on_cancel;
        if let Some(goal) = self.goals.get_mut(&handle) {
            if goal.status.is_done() {
                return;
            }
            if hang {
                goal.hung = true;
            } else {
                goal.status = GoalStatus::Canceled;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{simulation, SimParams};

    #[test]
    fn test_goal_completes() {
        let (robot, mut planner) = simulation(&SimParams {
            obstacles: vec![],
            ..SimParams::default()
        });

        let goal = Pose2D::new(2.0, 5.0, 0.0);
        let h = planner.submit_goal(&Stamped::now("map", goal));

        assert_eq!(planner.poll(h), GoalStatus::Active);

        let mut polls = 0;
        while !planner.poll(h).is_done() {
            polls += 1;
            assert!(polls < 100);
        }

        assert_eq!(planner.poll(h), GoalStatus::Succeeded);
        assert!((robot.pose().position_m - goal.position_m).norm() < 1e-9);
    }

    #[test]
    fn test_goal_blocked() {
        let (robot, mut planner) = simulation(&SimParams::default());

        // Default obstacle covers x in [4, 5]
        let h = planner.submit_goal(&Stamped::now("map", Pose2D::new(4.5, 5.0, 0.0)));

        let mut status = planner.poll(h);
        while !status.is_done() {
            status = planner.poll(h);
        }

        assert_eq!(status, GoalStatus::Aborted);
        assert!(robot.pose().position_m.x < 4.0);
    }

    #[test]
    fn test_cancel_and_route_failures() {
        let (_, mut planner) = simulation(&SimParams::default());
        planner.route_failures = 1;

        let a = Pose2D::new(1.0, 1.0, 0.0);
        let b = Pose2D::new(2.0, 1.0, 0.0);
        assert!(planner.create_route(&a, &b).is_none());
        let r = planner.create_route(&a, &b).unwrap();
        assert_eq!(r.len(), 11);
        assert_eq!(r.poses.last(), Some(&b));

        let h = planner.submit_goal(&Stamped::now("map", b));
        planner.cancel(h);
        assert_eq!(planner.poll(h), GoalStatus::Canceled);
        assert_eq!(planner.poll(GoalHandle(99)), GoalStatus::Aborted);

        planner.hang_on_cancel = true;
        let h = planner.submit_goal(&Stamped::now("map", b));
        planner.cancel(h);
        for _ in 0..10 {
            assert_eq!(planner.poll(h), GoalStatus::Active);
        }
    }
}
