//! Forward wall and side space detection

use comms_if::eqpt::scan::RangeScan;
use log::{debug, info};

use crate::params::MovementParams;

/// Check for a wall across the forward cone, and if there is one pick a side to head for.
///
/// Returns the seed angle for the safety angle search, which is `0.0` when a wall was found but
/// neither side is clearly better.
pub(super) fn forward_wall(scan: &RangeScan, params: &MovementParams) -> Option<f64> {
    if scan.is_empty() || scan.angle_increment <= 0.0 {
        return None;
    }

    let centre = scan.len() / 2;
    let k = ((params.wall_forward_angle_rad / scan.angle_increment) as usize).max(1);
    let plus = (centre + k).min(scan.len());
    let minus = centre.saturating_sub(k);

    let valid: Vec<f64> = (minus..plus).filter_map(|i| scan.range(i)).collect();
    if valid.is_empty() {
        return None;
    }

    let rate = valid.len() as f64 / (plus - minus) as f64;
    let distance = valid.iter().sum::<f64>() / valid.len() as f64;

    debug!("Forward wall check: rate {:.2}, distance {:.2} m", rate, distance);

    if rate > params.wall_rate_threshold
        && distance < params.wall_distance_upper_threshold_m
        && distance > params.wall_distance_lower_threshold_m
    {
        info!("Wall found {:.2} m ahead", distance);
        Some(side_space(scan, plus, minus, params.emergency_threshold_m))
    } else {
        None
    }
}

/// Compare the free space either side of the forward cone `[minus, plus)`.
///
/// The free space of a side is the largest step in forward distance between consecutive valid
/// returns. The side with more free space is taken if its mean range is also above
/// `min_mean_m`.
fn side_space(scan: &RangeScan, plus: usize, minus: usize, min_mean_m: f64) -> f64 {
    let n = scan.len();
    let centre = n / 2;
    let forward = |i: usize, r: f64| r * scan.angle_of(i).cos();

    // Right side, each return against the next valid one towards the centre
    let mut space_right: f64 = 0.0;
    let mut right = Vec::new();
    for i in 0..minus {
        if let Some(r) = scan.range(i) {
            right.push(r);
            if let Some((j, rj)) = ((i + 1)..minus).find_map(|j| scan.range(j).map(|rj| (j, rj))) {
                space_right = space_right.max((forward(i, r) - forward(j, rj)).abs());
            }
        }
    }

    // Left side, each return against the previous valid one
    let mut space_left: f64 = 0.0;
    let mut left = Vec::new();
    for i in plus..n {
        if let Some(r) = scan.range(i) {
            left.push(r);
            if let Some((j, rj)) = (0..i).rev().find_map(|j| scan.range(j).map(|rj| (j, rj))) {
                space_left = space_left.max((forward(i, r) - forward(j, rj)).abs());
            }
        }
    }

    let mean = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };
    let (mean_right, mean_left) = (mean(&right), mean(&left));

    if space_right > space_left && mean_right > min_mean_m {
        info!("Found space on the right");
        (scan.angle_min + scan.angle_increment * (centre + minus) as f64 / 2.0) / 2.0
    } else if space_left > space_right && mean_left > min_mean_m {
        info!("Found space on the left");
        (scan.angle_min + scan.angle_increment * (plus + centre) as f64 / 2.0) / 2.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{avoid::AvoidanceAction, avoid::ReactiveObstacleAvoider, memory::AvoidanceMemory};
    use comms_if::eqpt::contact::ContactEvent;
    use std::f64::consts::{FRAC_PI_2, PI};

    /// Wall 2 m ahead, an opening on the right and a close side wall on the left.
    fn walled_scan() -> RangeScan {
        let ranges = (0..181)
            .map(|i| {
                let a = -FRAC_PI_2 + i as f64 * PI / 180.0;
                if a.abs() <= 0.3 {
                    2.0 / a.cos()
                } else if a > 0.3 || a < -1.0 {
                    1.0
                } else {
                    6.0
                }
            })
            .collect();
        RangeScan::from_ranges(-FRAC_PI_2, FRAC_PI_2, ranges)
    }

    #[test]
    fn test_forward_wall() {
        let params = MovementParams::default();

        let angle = forward_wall(&walled_scan(), &params).unwrap();
        assert!(angle < 0.0);

        // Too far away to count as a wall
        let far = RangeScan::from_ranges(-FRAC_PI_2, FRAC_PI_2, vec![8.0; 181]);
        assert_eq!(forward_wall(&far, &params), None);

        // Too sparse
        let sparse = RangeScan::from_ranges(
            -FRAC_PI_2,
            FRAC_PI_2,
            (0..181)
                .map(|i| if i % 2 == 0 { 2.0 } else { std::f64::NAN })
                .collect(),
        );
        assert_eq!(forward_wall(&sparse, &params), None);
    }

    #[test]
    fn test_wall_seeds_safe_angle() {
        let mut memory = AvoidanceMemory::default();
        let contact = ContactEvent::released();

        // Without wall detection the opening is taken as a road edge
        let d = ReactiveObstacleAvoider::new(&MovementParams::default()).decide(
            &walled_scan(),
            &contact,
            &mut memory,
        );
        assert!(matches!(d.action, AvoidanceAction::RoadCentre { .. }));

        let avoider = ReactiveObstacleAvoider::new(&MovementParams {
            wall_detection: true,
            ..MovementParams::default()
        });
        let d = avoider.decide(&walled_scan(), &contact, &mut memory);
        match d.action {
            AvoidanceAction::SafeAngle { angle_rad } => assert!(angle_rad < 0.0),
            a => panic!("Expected a safe angle, got {:?}", a),
        }
    }
}
