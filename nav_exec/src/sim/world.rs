//! # Simulated world

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Duration, Utc};
use comms_if::{
    eqpt::{
        contact::Bumper,
        grid::{GridInfo, LETHAL_CELL},
        scan::RangeScan,
    },
    tc::vel::VelocityCmd,
    Stamped,
};
use log::trace;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{loc::Pose2D, map::OccupancyGrid, map::SearchWindow};
use util::maths::wrap_pi;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Cost given to cells near an obstacle in the costmap
const INFLATED_CELL: i8 = 50;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Name of the frame all simulated data is expressed in
    pub frame_id: String,

    /// Size of the world along X, starting at zero.
    ///
    /// Units: meters
    pub world_width_m: f64,

    /// Size of the world along Y, starting at zero.
    ///
    /// Units: meters
    pub world_height_m: f64,

    /// Units: meters/cell
    pub resolution_m: f64,

    /// Obstacles as `[min_x, min_y, max_x, max_y]` rectangles.
    ///
    /// Units: meters
    pub obstacles: Vec<[f64; 4]>,

    /// Whether the edge of the world is walled in
    pub border_walls: bool,

    /// Distance around obstacles which is marked as costly in the costmap, but which the robot can
    /// still physically drive through.
    ///
    /// Units: meters
    pub inflation_m: f64,

    /// Start pose as `[x, y, heading]`.
    ///
    /// Units: meters, radians
    pub start_pose: [f64; 3],

    /// Radius of the robot's footprint.
    ///
    /// Units: meters
    pub robot_radius_m: f64,

    /// Number of rays in each scan
    pub scan_rays: usize,

    /// Angular width of the scan, centred on the robot's heading.
    ///
    /// Units: radians
    pub scan_fov_rad: f64,

    /// Returns beyond this are reported as missing.
    ///
    /// Units: meters
    pub scan_max_range_m: f64,

    /// Time the robot moves for on each single command.
    ///
    /// Units: seconds
    pub step_period_s: f64,

    /// Distance between waypoints of planner routes.
    ///
    /// Units: meters
    pub route_separation_m: f64,

    /// Number of route waypoints the robot advances through on each goal poll
    pub waypoints_per_poll: usize,
}

/// The simulated world: ground truth obstacles, the costmap given to the robot, and the robot
/// itself.
#[derive(Debug, Clone)]
pub struct SimWorld {
    pub params: SimParams,

    /// Ground truth occupancy, used for collisions and range scans
    pub truth: OccupancyGrid,

    /// Costmap sent to the robot, the truth with inflation around obstacles
    pub costmap: OccupancyGrid,

    /// Pose of the robot
    pub pose: Pose2D,

    /// Bumper segment currently in contact, if any
    pub contact: Option<Bumper>,

    /// Simulation time
    ///
    /// Units: seconds
    pub time_s: f64,

    epoch: DateTime<Utc>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            frame_id: "map".into(),
            world_width_m: 10.0,
            world_height_m: 10.0,
            resolution_m: 0.05,
            obstacles: vec![[4.0, 3.0, 5.0, 7.0]],
            border_walls: true,
            inflation_m: 0.3,
            start_pose: [1.0, 5.0, 0.0],
            robot_radius_m: 0.15,
            scan_rays: 181,
            scan_fov_rad: std::f64::consts::PI,
            scan_max_range_m: 10.0,
            step_period_s: 0.1,
            route_separation_m: 0.1,
            waypoints_per_poll: 5,
        }
    }
}

impl SimWorld {
    /// Build the world described by the parameters.
    pub fn new(params: SimParams) -> Self {
        let info = GridInfo {
            width: (params.world_width_m / params.resolution_m).ceil().max(0.0) as usize,
            height: (params.world_height_m / params.resolution_m).ceil().max(0.0) as usize,
            resolution_m: params.resolution_m,
            origin_x_m: 0.0,
            origin_y_m: 0.0,
        };

        let mut truth = OccupancyGrid::new(info, 0);
        for o in &params.obstacles {
            truth.fill_rect(Vector2::new(o[0], o[1]), Vector2::new(o[2], o[3]), LETHAL_CELL);
        }
        if params.border_walls && info.width > 0 && info.height > 0 {
            for x in 0..info.width {
                truth.set(x, 0, LETHAL_CELL);
                truth.set(x, info.height - 1, LETHAL_CELL);
            }
            for y in 0..info.height {
                truth.set(0, y, LETHAL_CELL);
                truth.set(info.width - 1, y, LETHAL_CELL);
            }
        }

        let pose = Pose2D::new(
            params.start_pose[0],
            params.start_pose[1],
            params.start_pose[2],
        );

        let mut world = Self {
            costmap: truth.clone(),
            truth,
            pose,
            contact: None,
            time_s: 0.0,
            epoch: Utc::now(),
            params,
        };
        world.inflate();
        world
    }

    /// Rebuild the costmap from the truth and the inflation distance.
    pub fn inflate(&mut self) {
        let mut costmap = self.truth.clone();
        let reach = self.params.inflation_m * 2.0;

        for x in 0..self.truth.width() {
            for y in 0..self.truth.height() {
                if !self.truth.is_blocked(x, y) {
                    continue;
                }
                let centre = self.truth.index_to_world(x, y);
                if let Some(w) = SearchWindow::around(&self.truth, &centre, reach, reach) {
                    for (wx, wy) in w.cells() {
                        let d = (self.truth.index_to_world(wx, wy) - centre).norm();
                        if d <= self.params.inflation_m && !costmap.is_blocked(wx, wy) {
                            costmap.set(wx, wy, INFLATED_CELL);
                        }
                    }
                }
            }
        }

        self.costmap = costmap;
    }

    /// Stamp data with the current simulation time.
    pub fn stamp<T>(&self, data: T) -> Stamped<T> {
        let elapsed = Duration::microseconds((self.time_s * 1e6) as i64);
        Stamped {
            stamp: self.epoch + elapsed,
            frame_id: self.params.frame_id.clone(),
            data,
        }
    }

    /// Whether the robot's footprint at `position_m` touches an obstacle.
    pub fn collides(&self, position_m: &Vector2<f64>) -> bool {
        let r = self.params.robot_radius_m;
        match SearchWindow::around(&self.truth, position_m, 2.0 * r, 2.0 * r) {
            Some(w) => w.cells().any(|(x, y)| {
                self.truth.is_blocked(x, y)
                    && (self.truth.index_to_world(x, y) - position_m).norm() <= r
            }),
            None => false,
        }
    }

    /// Whether `position_m` is in a blocked ground truth cell or outside the world.
    pub fn is_blocked_at(&self, position_m: &Vector2<f64>) -> bool {
        let (x, y) = self.truth.world_to_index(position_m);
        if x < 0 || y < 0 {
            return true;
        }
        match self.truth.get(x as usize, y as usize) {
            Some(v) => v > 0,
            None => true,
        }
    }

    /// Move the robot under `cmd` for `dt_s` seconds.
    ///
    /// Motion into an obstacle is stopped at the obstacle's edge and sets the contact state.
    pub fn step(&mut self, cmd: &VelocityCmd, dt_s: f64) {
        let heading = wrap_pi(self.pose.heading_rad + cmd.angular_rads * dt_s);
        let dir = Vector2::new(heading.cos(), heading.sin());
        let position = self.pose.position_m + dir * cmd.linear_ms * dt_s;

        self.pose.heading_rad = heading;
        if self.collides(&position) {
            self.contact = Some(if cmd.linear_ms >= 0.0 {
                Bumper::Centre
            } else {
                // Reversing into something, report the side it's turning away from
                if cmd.angular_rads >= 0.0 {
                    Bumper::Right
                } else {
                    Bumper::Left
                }
            });
            trace!("Sim robot contact at {:?}", position);
        } else {
            self.pose.position_m = position;
            self.contact = None;
        }

        self.time_s += dt_s;
    }

    /// Advance the clock without moving the robot.
    pub fn wait(&mut self, dt_s: f64) {
        self.time_s += dt_s;
    }

    /// Ray cast a scan from the robot's current pose.
    pub fn scan(&self) -> RangeScan {
        let p = &self.params;
        let half = p.scan_fov_rad / 2.0;
        let step = self.truth.resolution_m() / 2.0;

        let ranges = (0..p.scan_rays)
            .map(|i| {
                let a = if p.scan_rays > 1 {
                    -half + p.scan_fov_rad * i as f64 / (p.scan_rays - 1) as f64
                } else {
                    0.0
                };
                let dir = Vector2::new(
                    (self.pose.heading_rad + a).cos(),
                    (self.pose.heading_rad + a).sin(),
                );

                let mut d = step;
                while d <= p.scan_max_range_m {
                    let point = self.pose.position_m + dir * d;
                    let (x, y) = self.truth.world_to_index(&point);
                    if x < 0 || y < 0 || x as usize >= self.truth.width() || y as usize >= self.truth.height() {
                        break;
                    }
                    if self.truth.is_blocked(x as usize, y as usize) {
                        return d;
                    }
                    d += step;
                }
                std::f64::NAN
            })
            .collect();

        RangeScan::from_ranges(-half, half, ranges)
    }
}
