//! # Goal decision
//!
//! Strategies which pick the next goal for the robot to explore. The navigation core only sees the
//! [`GoalDecision`] trait, so strategies can be swapped without touching the movement code.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use comms_if::Stamped;
use log::{debug, info};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::params::{self, LoadError};

use crate::loc::Pose2D;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A strategy for choosing where to go next.
pub trait GoalDecision {
    /// Choose the next goal given the robot's pose, or `None` when there's nowhere left to go.
    fn decide_goal(&mut self, pose: &Stamped<Pose2D>) -> Option<Stamped<Vector2<f64>>>;

    /// Load the strategy's parameters from a file in the parameters directory.
    fn load_params(&mut self, file: &str) -> Result<(), LoadError>;

    /// Apply a parameter change given as a TOML fragment. Keys not in the fragment return to
    /// their defaults.
    fn on_config_change(&mut self, config: &str) -> Result<(), LoadError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypointQueueParams {
    /// Goals closer than this to the robot or to the previous goal are skipped.
    ///
    /// Units: meters
    pub last_goal_tolerance_m: f64,
}

/// Visits a fixed list of goals in order.
#[derive(Debug, Clone)]
pub struct WaypointQueue {
    params: WaypointQueueParams,
    frame_id: String,
    goals: VecDeque<Vector2<f64>>,
    last_goal: Option<Vector2<f64>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for WaypointQueueParams {
    fn default() -> Self {
        Self {
            last_goal_tolerance_m: 0.1,
        }
    }
}

impl WaypointQueue {
    pub fn new<S: Into<String>>(
        params: WaypointQueueParams,
        frame_id: S,
        goals: Vec<Vector2<f64>>,
    ) -> Self {
        Self {
            params,
            frame_id: frame_id.into(),
            goals: goals.into(),
            last_goal: None,
        }
    }

    /// Build a queue from a flat list of coordinates, `[x0, y0, x1, y1, ...]`. A trailing odd
    /// value is ignored.
    pub fn from_flat<S: Into<String>>(params: WaypointQueueParams, frame_id: S, xy: &[f64]) -> Self {
        let goals = xy
            .chunks_exact(2)
            .map(|c| Vector2::new(c[0], c[1]))
            .collect();
        Self::new(params, frame_id, goals)
    }

    /// Number of goals not yet issued.
    pub fn remaining(&self) -> usize {
        self.goals.len()
    }

    pub fn params(&self) -> &WaypointQueueParams {
        &self.params
    }
}

impl GoalDecision for WaypointQueue {
    fn decide_goal(&mut self, pose: &Stamped<Pose2D>) -> Option<Stamped<Vector2<f64>>> {
        let tol = self.params.last_goal_tolerance_m;

        while let Some(goal) = self.goals.pop_front() {
            let near_robot = pose.data.distance_to(&goal) < tol;
            let near_last = self
                .last_goal
                .map(|l| (l - goal).norm() < tol)
                .unwrap_or(false);

            if near_robot || near_last {
                debug!("Skipping goal ({:.2}, {:.2})", goal.x, goal.y);
                continue;
            }

            info!("Next goal ({:.2}, {:.2})", goal.x, goal.y);
            self.last_goal = Some(goal);
            return Some(Stamped::now(self.frame_id.clone(), goal));
        }

        info!("No goals left");
        None
    }

    fn load_params(&mut self, file: &str) -> Result<(), LoadError> {
        self.params = params::load(file)?;
        Ok(())
    }

    fn on_config_change(&mut self, config: &str) -> Result<(), LoadError> {
        self.params = params::from_str(config)?;
        info!(
            "Goal decision reconfigured: last goal tolerance {} m",
            self.params.last_goal_tolerance_m
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pose(x: f64, y: f64) -> Stamped<Pose2D> {
        Stamped::now("map", Pose2D::new(x, y, 0.0))
    }

    #[test]
    fn test_goals_in_order() {
        let mut q = WaypointQueue::from_flat(
            WaypointQueueParams::default(),
            "map",
            &[2.0, 1.0, 3.0, 1.0, 9.0],
        );
        assert_eq!(q.remaining(), 2);

        let g = q.decide_goal(&pose(0.0, 0.0)).unwrap();
        assert_eq!(g.data, Vector2::new(2.0, 1.0));
        assert_eq!(g.frame_id, "map");

        let g = q.decide_goal(&pose(2.0, 1.0)).unwrap();
        assert_eq!(g.data, Vector2::new(3.0, 1.0));

        assert!(q.decide_goal(&pose(3.0, 1.0)).is_none());
    }

    #[test]
    fn test_close_goals_skipped() {
        let mut q = WaypointQueue::new(
            WaypointQueueParams {
                last_goal_tolerance_m: 0.5,
            },
            "map",
            vec![
                // At the robot
                Vector2::new(0.1, 0.0),
                Vector2::new(2.0, 0.0),
                // Same as the previous goal
                Vector2::new(2.2, 0.0),
                Vector2::new(4.0, 0.0),
            ],
        );

        assert_eq!(q.decide_goal(&pose(0.0, 0.0)).unwrap().data.x, 2.0);
        assert_eq!(q.decide_goal(&pose(1.0, 0.0)).unwrap().data.x, 4.0);
        assert_eq!(q.remaining(), 0);
    }

    #[test]
    fn test_config_change() {
        let mut q = WaypointQueue::from_flat(WaypointQueueParams::default(), "map", &[]);

        q.on_config_change("last_goal_tolerance_m = 1.5").unwrap();
        assert_eq!(q.params().last_goal_tolerance_m, 1.5);

        // Missing keys go back to their defaults
        q.on_config_change("").unwrap();
        assert_eq!(q.params().last_goal_tolerance_m, 0.1);

        assert!(q.on_config_change("last_goal_tolerance_m = \"far\"").is_err());
        assert_eq!(q.params().last_goal_tolerance_m, 0.1);
    }
}
