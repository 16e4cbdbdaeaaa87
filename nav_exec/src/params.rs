//! # Navigation Parameters
//!
//! All parameters take their documented default when missing from the parameter file.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{goal_decision::WaypointQueueParams, sim::SimParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the whole executable, as loaded from `nav_exec.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavExecParams {
    pub movement: MovementParams,

    pub goal_decision: WaypointQueueParams,

    pub sim: SimParams,
}

/// Parameters for the movement controllers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementParams {
    // ---- VELOCITIES ----
    /// Linear velocity when driving forward.
    ///
    /// Units: meters/second
    pub forward_velocity_ms: f64,

    /// Linear velocity of the contact reflex, should be negative.
    ///
    /// Units: meters/second
    pub back_velocity_ms: f64,

    /// How long the contact reflex reverses for.
    ///
    /// Units: seconds
    pub back_time_s: f64,

    /// Angular velocity used for all rotations on the spot.
    ///
    /// Units: radians/second
    pub rotation_velocity_rads: f64,

    // ---- SAFETY ANGLE SEARCH ----
    /// Half width of the cone checked around a candidate heading.
    ///
    /// Units: radians
    pub forward_angle_rad: f64,

    /// Returns closer than this count as occupied in the candidate cone.
    ///
    /// Units: meters
    pub safety_range_threshold_m: f64,

    /// Largest fraction of occupied returns for which a candidate heading is still safe.
    pub safety_rate_threshold: f64,

    // ---- EMERGENCY AVOIDANCE ----
    /// At least one side of the scan must have a mean range above this to be avoidable.
    ///
    /// Units: meters
    pub emergency_threshold_m: f64,

    /// The remembered avoidance side only changes when the side means differ by more than this.
    ///
    /// Units: meters
    pub emergency_diff_threshold_m: f64,

    // ---- ROAD CENTRE ----
    /// Only returns with a forward distance up to this are considered for road centre detection.
    ///
    /// Units: meters
    pub road_center_threshold_m: f64,

    /// Minimum lateral jump between neighbouring returns which marks a road edge.
    ///
    /// Units: meters
    pub road_threshold_m: f64,

    // ---- GAINS ----
    /// Proportional gain on the heading offset.
    pub curve_gain: f64,

    /// Time constant used when a safety angle or emergency side steers the robot.
    ///
    /// Units: seconds
    pub avoidance_gain: f64,

    /// Time constant used when steering to a road centre.
    ///
    /// Units: seconds
    pub road_center_gain: f64,

    // ---- WALL DETECTION ----
    /// Enables forward wall detection before the road centre heuristic.
    pub wall_detection: bool,

    /// Half width of the forward cone checked for a wall.
    ///
    /// Units: radians
    pub wall_forward_angle_rad: f64,

    /// Fraction of valid returns in the forward cone needed to declare a wall.
    pub wall_rate_threshold: f64,

    /// Walls further away than this are ignored.
    ///
    /// Units: meters
    pub wall_distance_upper_threshold_m: f64,

    /// Walls closer than this are ignored.
    ///
    /// Units: meters
    pub wall_distance_lower_threshold_m: f64,

    // ---- COSTMAP ----
    /// Side length of the square window checked around a pose for occupied cells.
    ///
    /// Units: meters
    pub costmap_margin_m: f64,

    /// Number of escape sectors along X.
    pub div_x: usize,

    /// Number of escape sectors along Y.
    pub div_y: usize,

    /// Width of the escape search window.
    ///
    /// Units: meters
    pub esc_map_x_m: f64,

    /// Height of the escape search window.
    ///
    /// Units: meters
    pub esc_map_y_m: f64,

    // ---- GOAL NAVIGATION ----
    /// Number of route waypoints stepped back per backtrack hop.
    pub path_back_interval: usize,

    /// Number of route requests made before backtracking gives up.
    pub path_retry_limit: usize,

    /// Delay between route requests.
    ///
    /// Units: seconds
    pub path_retry_interval_s: f64,

    /// Rate at which an active goal is polled.
    ///
    /// Units: hertz
    pub goal_poll_rate_hz: f64,

    /// Number of times the planning service is waited for before it is declared unavailable.
    pub service_wait_limit: usize,

    /// Angular bias applied to the straight line heading when no route is available.
    ///
    /// Units: degrees
    pub angle_bias_deg: f64,

    /// Number of waypoints back from the end of a route used to estimate its direction.
    pub route_direction_lookback: usize,

    // ---- ROTATION ----
    /// Rotations stop when within this of the requested angle.
    ///
    /// Units: radians
    pub rotation_tolerance_rad: f64,

    // ---- TIMING ----
    /// Longest wait for any single sensor read.
    ///
    /// Units: seconds
    pub sensor_timeout_s: f64,

    /// Period at which commands are repeated when a command must be held.
    ///
    /// Units: seconds
    pub command_period_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            forward_velocity_ms: 0.2,
            back_velocity_ms: -0.2,
            back_time_s: 1.0,
            rotation_velocity_rads: 0.5,
            forward_angle_rad: 0.17,
            safety_range_threshold_m: 1.25,
            safety_rate_threshold: 0.1,
            emergency_threshold_m: 0.1,
            emergency_diff_threshold_m: 0.1,
            road_center_threshold_m: 5.0,
            road_threshold_m: 1.5,
            curve_gain: 2.0,
            avoidance_gain: 0.4,
            road_center_gain: 0.8,
            wall_detection: false,
            wall_forward_angle_rad: 0.17,
            wall_rate_threshold: 0.8,
            wall_distance_upper_threshold_m: 5.0,
            wall_distance_lower_threshold_m: 0.5,
            costmap_margin_m: 0.4,
            div_x: 3,
            div_y: 3,
            esc_map_x_m: 0.9,
            esc_map_y_m: 0.9,
            path_back_interval: 5,
            path_retry_limit: 30,
            path_retry_interval_s: 2.0,
            goal_poll_rate_hz: 1.0,
            service_wait_limit: 60,
            angle_bias_deg: 10.0,
            route_direction_lookback: 5,
            rotation_tolerance_rad: 0.05,
            sensor_timeout_s: 1.0,
            command_period_s: 0.1,
        }
    }
}

impl MovementParams {
    /// Parameters which make every wait in the controllers effectively instant, used by tests
    /// against the simulator.
    pub fn fast() -> Self {
        Self {
            path_retry_interval_s: 0.0,
            goal_poll_rate_hz: 1e6,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file() {
        let p: NavExecParams = util::params::from_str(
            r#"
            [movement]
            div_x = 5
            wall_detection = true
            "#,
        )
        .unwrap();

        assert_eq!(p.movement.div_x, 5);
        assert!(p.movement.wall_detection);
        assert_eq!(p.movement.div_y, 3);
        assert_eq!(p.movement.path_retry_limit, 30);
        assert_eq!(p.movement.forward_velocity_ms, 0.2);
    }

    #[test]
    fn test_shipped_file_matches_defaults() {
        let p: NavExecParams =
            util::params::from_str(include_str!("../../params/nav_exec.toml")).unwrap();

        let d = NavExecParams::default();
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            serde_json::to_value(&d).unwrap()
        );
    }
}
