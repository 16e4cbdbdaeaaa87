//! # Planning service interface
//!
//! Long-horizon path search is performed by an external planning service. The navigation core
//! only requests routes from it, submits goals to it and polls those goals until they finish.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use comms_if::Stamped;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::loc::Pose2D;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An ordered sequence of poses from a start to a goal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    pub poses: Vec<Pose2D>,
}

/// Identifies a goal submitted to the planning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalHandle(pub u64);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Status of a submitted goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    /// Accepted but not yet being worked on
    Pending,

    /// The robot is being driven towards the goal
    Active,

    Succeeded,

    /// The service gave up on the goal
    Aborted,

    /// The goal was cancelled before completion
    Canceled,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The external planning service.
pub trait PlanningService {
    /// Wait up to `timeout` for the service to become available, returning whether it is.
    fn wait_for_server(&mut self, timeout: Duration) -> bool;

    /// Request a route from `start` to `goal`, `None` if no route could be produced.
    fn create_route(&mut self, start: &Pose2D, goal: &Pose2D) -> Option<Route>;

    /// Direction in which the robot should arrive at `goal` when starting from `start`.
    ///
    /// The default implementation uses the final `lookback` waypoints of `route`, requesting a new
    /// route if none is given. Returns `None` when no direction can be determined.
    fn route_direction(
        &mut self,
        start: &Pose2D,
        goal: &Pose2D,
        route: Option<&Route>,
        lookback: usize,
    ) -> Option<Vector2<f64>> {
        match route {
            Some(r) => r.approach_direction(lookback),
            None => self
                .create_route(start, goal)
                .and_then(|r| r.approach_direction(lookback)),
        }
    }

    /// Submit a goal, which the service will start working on.
    fn submit_goal(&mut self, goal: &Stamped<Pose2D>) -> GoalHandle;

    /// Get the current status of a submitted goal.
    fn poll(&mut self, handle: GoalHandle) -> GoalStatus;

    /// Cancel a submitted goal. The goal's status will eventually become `Canceled` unless it had
    /// already finished.
    fn cancel(&mut self, handle: GoalHandle);
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Route {
    pub fn new(poses: Vec<Pose2D>) -> Self {
        Self { poses }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pose2D> {
        self.poses.get(index)
    }

    /// The route up to and including waypoint `index`.
    pub fn truncated(&self, index: usize) -> Route {
        let end = (index + 1).min(self.poses.len());
        Route::new(self.poses[..end].to_vec())
    }

    /// Direction from the waypoint `lookback` places before the end of the route to the end.
    ///
    /// Short routes use their first waypoint instead. `None` if the route has fewer than two
    /// waypoints or they all coincide.
    pub fn approach_direction(&self, lookback: usize) -> Option<Vector2<f64>> {
        let last = self.poses.last()?;
        let from_idx = (self.poses.len() - 1).saturating_sub(lookback.max(1));
        let dir = last.position_m - self.poses[from_idx].position_m;

        if dir.norm_squared() > 0.0 {
            Some(dir)
        } else {
            None
        }
    }
}

impl GoalStatus {
    /// Whether the goal has reached a terminal status.
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            GoalStatus::Succeeded | GoalStatus::Aborted | GoalStatus::Canceled
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn line(n: usize) -> Route {
        Route::new((0..n).map(|i| Pose2D::new(i as f64, 0.0, 0.0)).collect())
    }

    #[test]
    fn test_approach_direction() {
        let mut r = line(10);
        // Bend the end of the route upwards
        r.poses[9].position_m.y = 1.0;

        let d = r.approach_direction(3).unwrap();
        assert_eq!(d, Vector2::new(3.0, 1.0));

        // Lookback longer than the route uses the start
        let d = line(3).approach_direction(10).unwrap();
        assert_eq!(d, Vector2::new(2.0, 0.0));

        assert_eq!(line(1).approach_direction(5), None);
        assert_eq!(line(0).approach_direction(5), None);
    }

    #[test]
    fn test_truncated() {
        let r = line(10);
        assert_eq!(r.truncated(4).len(), 5);
        assert_eq!(r.truncated(4).poses.last(), r.get(4));
        assert_eq!(r.truncated(20).len(), 10);
    }
}
