//! # Reactive obstacle avoidance
//!
//! Used when the robot is driving forward without a goal. Each tick the latest scan and contact
//! state are turned into a single velocity command, trying in priority order:
//!
//! 1. Contact reflex, reverse straight back for a fixed time.
//! 2. Forward wall detection, if enabled, which seeds the safety angle search with a side to go.
//! 3. Road centre, steer towards the middle of the widest lateral gap ahead.
//! 4. Safety angle search, find the heading closest to straight ahead with a clear cone.
//! 5. Emergency avoidance, steer towards the more open half of the scan.
//! 6. Recovery spin on the spot, towards the remembered avoidance side.
//!
//! The decision is computed without touching any IO so it can be checked in isolation, and applied
//! by the caller.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod wall;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{eqpt::contact::ContactEvent, eqpt::scan::RangeScan, tc::vel::VelocityCmd};
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::{
    io::{RobotIo, SensorGate},
    memory::AvoidanceMemory,
    params::MovementParams,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// A half of the scan with more than this fraction of missing returns is treated as open.
const EMERGENCY_NAN_RATE: f64 = 0.8;

/// Emergency avoidance steers by this fraction of the scan's maximum angle.
const EMERGENCY_ANGLE_FRACTION: f64 = 1.0 / 6.0;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which behaviour produced a tick's command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AvoidanceAction {
    /// Bumper pressed, reversing
    ContactReverse,

    /// Steering to the centre of a gap
    RoadCentre { angle_rad: f64 },

    /// Steering to a heading with a clear forward cone
    SafeAngle { angle_rad: f64 },

    /// No clear heading, steering to the more open side
    Emergency { sign: f64 },

    /// Nothing avoidable, turning on the spot
    RecoverySpin { sign: f64 },
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The command to send for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AvoidanceDecision {
    pub action: AvoidanceAction,

    pub cmd: VelocityCmd,

    /// How long the command must be held for, `None` for a single command.
    pub duration_s: Option<f64>,
}

/// Per-tick reactive avoidance from range and contact data.
#[derive(Debug, Clone)]
pub struct ReactiveObstacleAvoider {
    params: MovementParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReactiveObstacleAvoider {
    pub fn new(params: &MovementParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Decide the command for this tick.
    ///
    /// Always produces a command. Only the emergency side in `memory` is updated.
    pub fn decide(
        &self,
        scan: &RangeScan,
        contact: &ContactEvent,
        memory: &mut AvoidanceMemory,
    ) -> AvoidanceDecision {
        let p = &self.params;

        // ---- CONTACT REFLEX ----

        if let Some(reflex) = self.contact_reflex(contact) {
            return reflex;
        }

        // ---- HEURISTICS ----

        let seed_rad = if p.wall_detection {
            wall::forward_wall(scan, p)
        } else {
            None
        };

        let seed_rad = match seed_rad {
            Some(a) => a,
            None => {
                if let Some(angle_rad) = self.road_centre(scan) {
                    info!("Road centre found at {:.3} rad", angle_rad);
                    return self.steer(
                        AvoidanceAction::RoadCentre { angle_rad },
                        angle_rad,
                        p.road_center_gain,
                    );
                }
                0.0
            }
        };

        if let Some(angle_rad) = self.is_moveable(scan, seed_rad) {
            debug!("Safe angle {:.3} rad", angle_rad);
            return self.steer(
                AvoidanceAction::SafeAngle { angle_rad },
                angle_rad,
                p.avoidance_gain,
            );
        }

        // ---- NO SAFE ANGLE ----

        if let Some(sign) = self.emergency_side(scan, memory) {
            info!(
                "Emergency avoidance to the {}",
                if sign > 0.0 { "left" } else { "right" }
            );
            return self.steer(
                AvoidanceAction::Emergency { sign },
                sign * scan.angle_max * EMERGENCY_ANGLE_FRACTION,
                p.avoidance_gain,
            );
        }

        let sign = memory.sign_or_left();
        warn!("Can't avoid the obstacle, recovery spin");
        AvoidanceDecision {
            action: AvoidanceAction::RecoverySpin { sign },
            cmd: VelocityCmd::point_turn(sign * p.rotation_velocity_rads),
            duration_s: None,
        }
    }

    /// The reverse command if a bumper is pressed.
    ///
    /// Needs no range data, so callers can act on it before reading the scan.
    pub fn contact_reflex(&self, contact: &ContactEvent) -> Option<AvoidanceDecision> {
        if !contact.state {
            return None;
        }

        warn!("Contact on {:?} bumper, reversing", contact.bumper);
        Some(AvoidanceDecision {
            action: AvoidanceAction::ContactReverse,
            cmd: VelocityCmd::straight(self.params.back_velocity_ms),
            duration_s: Some(self.params.back_time_s),
        })
    }

    /// Send the decided command.
    pub fn apply<R: RobotIo>(&self, gate: &mut SensorGate<R>, decision: &AvoidanceDecision) {
        match decision.duration_s {
            Some(d) => gate.send_for(decision.cmd, d),
            None => gate.send(decision.cmd),
        }
    }

    /// Search outwards from `angle_rad` for a heading whose forward cone is mostly clear.
    ///
    /// Candidates alternate either side of the start index, one return further out each time.
    /// Returns `Some(0.0)` if the accepted heading is the scan's centre return, and `None` once
    /// the cone has moved entirely off the scan. A heading whose cone only partly overlaps the
    /// scan can lie beyond `angle_min` or `angle_max`.
    pub fn is_moveable(&self, scan: &RangeScan, angle_rad: f64) -> Option<f64> {
        let p = &self.params;
        let n = scan.len() as i64;

        let centre = scan.nearest_index(0.0)? as i64;
        let mut ti = if angle_rad == 0.0 {
            centre
        } else {
            scan.nearest_index(angle_rad)? as i64
        };

        let k = if scan.angle_increment > 0.0 {
            ((p.forward_angle_rad / scan.angle_increment) as i64).max(1)
        } else {
            1
        };

        let mut sw: i64 = 0;
        loop {
            ti += sw;

            let t_plus = ti + k;
            let t_minus = ti - k;
            if t_minus >= n || t_plus < 0 {
                debug!("Safety angle search failed");
                return None;
            }

            let plus = t_plus.min(n) as usize;
            let minus = t_minus.max(0) as usize;

            let rate = if plus > minus {
                let close = (minus..plus)
                    .filter_map(|i| scan.range(i))
                    .filter(|r| *r < p.safety_range_threshold_m)
                    .count();
                close as f64 / (plus - minus) as f64
            } else {
                1.0
            };

            if rate <= p.safety_rate_threshold {
                break;
            }

            sw = if sw > 0 { -sw - 1 } else { -sw + 1 };
        }

        if ti == centre {
            Some(0.0)
        } else {
            // The accepted cone may hang off the end of the scan
            Some(scan.angle_at(ti))
        }
    }

    /// Find the largest lateral jump between neighbouring returns in the forward corridor.
    ///
    /// Returns the angle midway between the two returns either side of the jump.
    pub fn road_centre(&self, scan: &RangeScan) -> Option<f64> {
        let p = &self.params;

        let points: Vec<(f64, f64)> = (0..scan.len())
            .filter_map(|i| scan.range(i).map(|r| (r, scan.angle_of(i))))
            .filter(|(r, a)| r * a.cos() <= p.road_center_threshold_m)
            .collect();

        points
            .windows(2)
            .map(|w| {
                let (r0, a0) = w[0];
                let (r1, a1) = w[1];
                ((r1 * a1.sin() - r0 * a0.sin()).abs(), (a0 + a1) / 2.0)
            })
            .filter(|(jump, _)| *jump >= p.road_threshold_m)
            .max_by_key(|(jump, _)| OrderedFloat(*jump))
            .map(|(_, mid)| mid)
    }

    /// Pick the side to avoid towards, or `None` if neither side is open enough.
    ///
    /// The right half of the scan is the first half of the returns. The remembered side only
    /// changes when the side means differ by more than the threshold.
    pub fn emergency_side(&self, scan: &RangeScan, memory: &mut AvoidanceMemory) -> Option<f64> {
        let p = &self.params;
        let half = scan.len() / 2;

        let ave_right = half_mean(scan, 0..half);
        let ave_left = half_mean(scan, half..scan.len());

        debug!("Emergency means: left {}, right {}", ave_left, ave_right);

        if ave_left <= p.emergency_threshold_m && ave_right <= p.emergency_threshold_m {
            return None;
        }

        let larger = if ave_left >= ave_right { 1.0 } else { -1.0 };
        let sign = match memory.avoidance_sign {
            Some(s) if (ave_left - ave_right).abs() <= p.emergency_diff_threshold_m => s,
            _ => larger,
        };

        memory.avoidance_sign = Some(sign);
        Some(sign)
    }

    fn steer(&self, action: AvoidanceAction, theta_rad: f64, time_const: f64) -> AvoidanceDecision {
        AvoidanceDecision {
            action,
            cmd: VelocityCmd::new(
                self.params.forward_velocity_ms,
                self.params.curve_gain * theta_rad / time_const,
            ),
            duration_s: None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Mean of the valid returns in `range`, or `f64::MAX` when most of them are missing.
fn half_mean(scan: &RangeScan, range: std::ops::Range<usize>) -> f64 {
    let len = range.len();
    let valid: Vec<f64> = range.filter_map(|i| scan.range(i)).collect();
    let nan_count = len - valid.len();

    if valid.is_empty() || nan_count as f64 > len as f64 * EMERGENCY_NAN_RATE {
        std::f64::MAX
    } else {
        valid.iter().sum::<f64>() / valid.len() as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::contact::Bumper;
    use std::f64::consts::FRAC_PI_2;

    /// 181 returns over the front half plane, one degree apart.
    fn scan_from<F: Fn(f64) -> f64>(f: F) -> RangeScan {
        let ranges = (0..181)
            .map(|i| f(-FRAC_PI_2 + i as f64 * std::f64::consts::PI / 180.0))
            .collect();
        RangeScan::from_ranges(-FRAC_PI_2, FRAC_PI_2, ranges)
    }

    fn avoider() -> ReactiveObstacleAvoider {
        ReactiveObstacleAvoider::new(&MovementParams::default())
    }

    fn no_contact() -> ContactEvent {
        ContactEvent::released()
    }

    #[test]
    fn test_open_scan_is_moveable() {
        let scan = scan_from(|_| 10.0);
        assert_eq!(avoider().is_moveable(&scan, 0.0), Some(0.0));
    }

    #[test]
    fn test_blocked_cone_searches_outwards() {
        // Forward cone at 0.5 m, everything else open
        let scan = scan_from(|a| if a.abs() < 0.17 { 0.5 } else { 10.0 });

        let angle = avoider().is_moveable(&scan, 0.0).unwrap();
        assert!(angle.abs() > 0.17);

        // Nothing is clear anywhere
        let scan = scan_from(|_| 0.5);
        assert_eq!(avoider().is_moveable(&scan, 0.0), None);
    }

    #[test]
    fn test_open_edge_beyond_scan() {
        // Only the rightmost six returns are clear
        let scan = scan_from(|a| if a < -FRAC_PI_2 + 0.09 { 1.3 } else { 0.5 });
        let inc = std::f64::consts::PI / 180.0;

        // First accepted cone is centred three returns off the right end
        let angle = avoider().is_moveable(&scan, 0.0).unwrap();
        assert!((angle - (-FRAC_PI_2 - 3.0 * inc)).abs() < 1e-9);

        let mut memory = AvoidanceMemory::default();
        let d = avoider().decide(&scan, &no_contact(), &mut memory);
        match d.action {
            AvoidanceAction::SafeAngle { angle_rad } => {
                assert!((angle_rad - angle).abs() < 1e-12);
                assert!((d.cmd.angular_rads - 2.0 * angle / 0.4).abs() < 1e-9);
                assert!(d.cmd.angular_rads.abs() < 10.0);
            }
            a => panic!("Expected a safe angle, got {:?}", a),
        }
    }

    #[test]
    fn test_missing_returns_are_clear() {
        let scan = scan_from(|_| std::f64::NAN);
        let mut memory = AvoidanceMemory::default();

        assert_eq!(avoider().is_moveable(&scan, 0.0), Some(0.0));
        let d = avoider().decide(&scan, &no_contact(), &mut memory);
        assert_eq!(d.action, AvoidanceAction::SafeAngle { angle_rad: 0.0 });
        assert_eq!(d.cmd, VelocityCmd::new(0.2, 0.0));
    }

    #[test]
    fn test_contact_reflex() {
        let params = MovementParams::default();
        let mut memory = AvoidanceMemory::default();

        for scan in &[scan_from(|_| 10.0), scan_from(|_| 0.05)] {
            let d = avoider().decide(scan, &ContactEvent::pressed(Bumper::Left), &mut memory);

            assert_eq!(d.action, AvoidanceAction::ContactReverse);
            assert_eq!(d.cmd, VelocityCmd::straight(params.back_velocity_ms));
            assert_eq!(d.duration_s, Some(params.back_time_s));
        }
        assert_eq!(memory, AvoidanceMemory::default());
    }

    #[test]
    fn test_road_centre() {
        // Corridor with the right wall 1 m away and the left wall 2 m away
        let scan = scan_from(|a| {
            let r = if a < 0.0 { -1.0 / a.sin() } else { 2.0 / a.sin() };
            if r.is_finite() && r <= 10.0 {
                r
            } else {
                std::f64::NAN
            }
        });
        let mut memory = AvoidanceMemory::default();
        let d = avoider().decide(&scan, &no_contact(), &mut memory);

        match d.action {
            AvoidanceAction::RoadCentre { angle_rad } => {
                // Corridor centre is to the left
                assert!(angle_rad > 0.0);
                assert!((d.cmd.angular_rads - 2.0 * angle_rad / 0.8).abs() < 1e-12);
                assert_eq!(d.cmd.linear_ms, 0.2);
            }
            a => panic!("Expected road centre, got {:?}", a),
        }
    }

    #[test]
    fn test_emergency_and_hysteresis() {
        let a = avoider();
        let mut memory = AvoidanceMemory::default();

        // Right half slightly more open, no memory yet so the larger side is taken
        let noisy = |left: f64, right: f64| scan_from(move |a| if a < 0.0 { right } else { left });

        let d = a.decide(&noisy(0.55, 0.6), &no_contact(), &mut memory);
        assert_eq!(d.action, AvoidanceAction::Emergency { sign: -1.0 });
        let expected = 2.0 * (-FRAC_PI_2 / 6.0) / 0.4;
        assert!((d.cmd.angular_rads - expected).abs() < 1e-12);
        assert_eq!(memory.avoidance_sign, Some(-1.0));

        // Small differences either way don't change the side
        for (l, r) in &[(0.6, 0.55), (0.62, 0.6), (0.58, 0.55), (0.6, 0.6)] {
            let d = a.decide(&noisy(*l, *r), &no_contact(), &mut memory);
            assert_eq!(d.action, AvoidanceAction::Emergency { sign: -1.0 });
        }

        // A large difference does
        let d = a.decide(&noisy(1.2, 0.5), &no_contact(), &mut memory);
        assert_eq!(d.action, AvoidanceAction::Emergency { sign: 1.0 });
        assert_eq!(memory.avoidance_sign, Some(1.0));
    }

    #[test]
    fn test_mostly_missing_half_is_open() {
        let a = avoider();
        let mut memory = AvoidanceMemory::default();

        // Left half has no returns at all, right half is close
        let scan = scan_from(|a| if a < 0.0 { 0.5 } else { std::f64::NAN });
        assert_eq!(a.emergency_side(&scan, &mut memory), Some(1.0));
    }

    #[test]
    fn test_recovery_spin() {
        let a = avoider();
        let scan = scan_from(|_| 0.05);

        let mut memory = AvoidanceMemory::default();
        let d = a.decide(&scan, &no_contact(), &mut memory);
        assert_eq!(d.action, AvoidanceAction::RecoverySpin { sign: 1.0 });
        assert_eq!(d.cmd, VelocityCmd::point_turn(0.5));

        memory.avoidance_sign = Some(-1.0);
        let d = a.decide(&scan, &no_contact(), &mut memory);
        assert_eq!(d.cmd, VelocityCmd::point_turn(-0.5));
        assert_eq!(memory.avoidance_sign, Some(-1.0));
    }
}
