//! # Costmap escape
//!
//! When the robot's own footprint overlaps occupied cells the area around it is split into a
//! coarse grid of sectors. Each sector is scored by its mean positive occupancy (its risk), and
//! compared to the sector the robot is in. The robot turns to face the sector with the largest
//! drop in risk and drives forward, replanning after every step, until its footprint is clear.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tc::vel::VelocityCmd;
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;

use super::{overlaps, NavError};
use crate::{
    io::{RobotIo, SensorGate},
    loc::{heading_of, Pose2D},
    map::{OccupancyGrid, SearchWindow},
    memory::AvoidanceMemory,
    params::MovementParams,
    rotation::RotationController,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Gradient given to the sector containing the robot, so that it is never chosen
const CENTRE_GRAD: f64 = std::f64::MAX;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One sector of the escape search window.
#[derive(Debug, Clone, Serialize)]
pub struct EscapeSector {
    /// Position of the sector in the sector grid, `(x, y)`
    pub index: (usize, usize),

    /// Grid cell at the sector's centre
    pub centre_cell: (usize, usize),

    /// Position of the sector's centre
    pub centre_m: Vector2<f64>,

    /// Heading from the centre sector towards this one
    pub heading_rad: f64,

    /// Mean positive occupancy of the sector's cells
    pub risk: f64,

    /// Risk relative to the centre sector
    pub grad: f64,
}

/// The scored sectors around a pose and the one chosen to escape towards.
#[derive(Debug, Clone, Serialize)]
pub struct EscapePlan {
    pub div_x: usize,
    pub div_y: usize,

    /// Sectors in row-major order, sector `(x, y)` is at `y * div_x + x`
    pub sectors: Vec<EscapeSector>,

    /// Chosen sector, `None` when no sector is better than staying put
    pub chosen: Option<(usize, usize)>,
}

/// Drives the robot out of occupied terrain.
#[derive(Debug, Clone, Copy)]
pub struct CostmapEscapePlanner {
    div_x: usize,
    div_y: usize,
    esc_map_x_m: f64,
    esc_map_y_m: f64,
    costmap_margin_m: f64,
    forward_velocity_ms: f64,
    rotation: RotationController,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CostmapEscapePlanner {
    pub fn new(params: &MovementParams) -> Self {
        Self {
            div_x: params.div_x,
            div_y: params.div_y,
            esc_map_x_m: params.esc_map_x_m,
            esc_map_y_m: params.esc_map_y_m,
            costmap_margin_m: params.costmap_margin_m,
            forward_velocity_ms: params.forward_velocity_ms,
            rotation: RotationController::new(params),
        }
    }

    /// Score the sectors around `pose` and choose one to escape towards.
    ///
    /// Returns `None` if the search window doesn't overlap the grid or there are no sectors.
    pub fn plan(&self, pose: &Pose2D, grid: &OccupancyGrid) -> Option<EscapePlan> {
        if self.div_x == 0 || self.div_y == 0 {
            return None;
        }

        let window =
            SearchWindow::around(grid, &pose.position_m, self.esc_map_x_m, self.esc_map_y_m)?;

        let gw = window.span_x() / self.div_x;
        let gh = window.span_y() / self.div_y;

        // ---- RISK ----

        let mut sectors = Vec::with_capacity(self.div_x * self.div_y);
        for dy in 0..self.div_y {
            for dx in 0..self.div_x {
                let xs = window.left + dx * gw..window.left + (dx + 1) * gw;
                let ys = window.top + dy * gh..window.top + (dy + 1) * gh;

                let risk = if gw * gh > 0 {
                    grid.positive_sum(xs, ys) / (gw * gh) as f64
                } else {
                    0.0
                };

                let centre_cell = (
                    (window.left * 2 + (2 * dx + 1) * gw) / 2,
                    (window.top * 2 + (2 * dy + 1) * gh) / 2,
                );

                sectors.push(EscapeSector {
                    index: (dx, dy),
                    centre_cell,
                    centre_m: grid.index_to_world(centre_cell.0, centre_cell.1),
                    heading_rad: pose.heading_rad,
                    risk,
                    grad: 0.0,
                });
            }
        }

        // ---- GRADIENT AND DIRECTION ----

        let mci = (self.div_x / 2, self.div_y / 2);
        let centre_idx = mci.1 * self.div_x + mci.0;
        let centre_risk = sectors[centre_idx].risk;
        let centre_m = sectors[centre_idx].centre_m;

        for s in sectors.iter_mut() {
            if s.index == mci {
                s.grad = CENTRE_GRAD;
            } else {
                s.grad = s.risk - centre_risk;
                s.heading_rad = heading_of(&(s.centre_m - centre_m)).unwrap_or(pose.heading_rad);
            }
        }

        // ---- SELECTION ----

        let no_improvement = sectors
            .iter()
            .filter(|s| s.index != mci)
            .all(|s| s.grad == 0.0);

        let chosen = if no_improvement {
            None
        } else {
            let mut min_grad = std::f64::MAX;
            let mut min_ang = std::f64::MAX;
            let mut chosen = mci;

            // Scan from the top row down so ties resolve the same way every time
            for dy in (0..self.div_y).rev() {
                for dx in 0..self.div_x {
                    let s = &sectors[dy * self.div_x + dx];
                    let ang = pose.rotation_to(s.heading_rad).abs();

                    if s.grad < min_grad || (s.grad == min_grad && ang <= min_ang) {
                        min_grad = s.grad;
                        min_ang = ang;
                        chosen = s.index;
                    }
                }
            }

            Some(chosen)
        };

        Some(EscapePlan {
            div_x: self.div_x,
            div_y: self.div_y,
            sectors,
            chosen,
        })
    }

    /// Drive the robot until its footprint no longer overlaps the costmap.
    ///
    /// This keeps going for as long as the footprint overlaps, which depends on the environment
    /// clearing, and so may run for a long time. Returns the number of forward steps taken.
    pub fn escape<R: RobotIo>(
        &self,
        gate: &mut SensorGate<R>,
        memory: &mut AvoidanceMemory,
    ) -> Result<usize, NavError> {
        let mut steps = 0;

        loop {
            let pose = gate.pose()?.data;
            let grid = gate.grid()?.data;

            if !overlaps(&pose, &grid, self.costmap_margin_m) {
                info!("Footprint is clear of the costmap after {} steps", steps);
                return Ok(steps);
            }

            let target = match self.plan(&pose, &grid) {
                Some(plan) => {
                    debug!("Escape risk map:\n{}", plan.table(|s| s.risk));
                    debug!("Escape grad map:\n{}", plan.table(|s| s.grad));
                    plan.chosen.and_then(|c| plan.sector(c.0, c.1).map(|s| (c, s.heading_rad)))
                }
                None => None,
            };

            match target {
                Some((index, heading_rad)) => {
                    if memory.last_escape_sector != Some(index) {
                        info!("Escaping towards sector {:?}", index);
                        self.rotation
                            .rotate_from_to(gate, pose.heading_rad, heading_rad)?;
                        memory.last_escape_sector = Some(index);
                    }
                }
                None => warn!("Can't avoid the costmap, no sector is better than the current one"),
            }

            debug!("Escape forward");
            gate.send(VelocityCmd::straight(self.forward_velocity_ms));
            steps += 1;
        }
    }
}

impl EscapePlan {
    pub fn sector(&self, x: usize, y: usize) -> Option<&EscapeSector> {
        if x < self.div_x && y < self.div_y {
            self.sectors.get(y * self.div_x + x)
        } else {
            None
        }
    }

    /// Render a value of each sector as a table with Y upwards, the chosen sector is starred.
    pub fn table<F: Fn(&EscapeSector) -> f64>(&self, f: F) -> String {
        let mut out = String::new();
        for y in (0..self.div_y).rev() {
            out.push('|');
            for x in 0..self.div_x {
                if let Some(s) = self.sector(x, y) {
                    let star = if self.chosen == Some((x, y)) { "*" } else { " " };
                    let v = f(s);
                    if v == CENTRE_GRAD {
                        out.push_str(&format!("{}{:>8}|", star, "-"));
                    } else {
                        out.push_str(&format!("{}{:>8.2}|", star, v));
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}
