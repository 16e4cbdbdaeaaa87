//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float + FloatConst,
{
    let pi_t = T::PI();
    let tau_t = T::TAU();

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // rem_euclid gives [0, 2pi) so the lower bound is closed, move -pi over to +pi
    if wrapped <= -pi_t {
        wrapped + tau_t
    } else {
        wrapped
    }
}

/// Get the shortest signed rotation which takes heading `from` onto heading `to`.
///
/// The result is in the range (-pi, pi], positive being anticlockwise (right hand rule about Z).
/// Crossing the +/-pi boundary gives the short way round rather than the raw difference.
pub fn ang_diff<T>(from: T, to: T) -> T
where
    T: Float + FloatConst,
{
    wrap_pi(to - from)
}

/// Return `1` for positive or zero values and `-1` for negative values.
///
/// Unlike `signum` zero is treated as positive, which is the convention used when a direction
/// must be chosen.
pub fn sign_or_pos<T>(value: T) -> T
where
    T: Float,
{
    if value < T::zero() {
        -T::one()
    } else {
        T::one()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{PI, TAU};

    const EPS: f64 = 1e-12;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0.0f64)).abs() < EPS);
        assert!((wrap_pi(PI) - PI).abs() < EPS);
        assert!((wrap_pi(-PI) - PI).abs() < EPS);
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
        assert!((wrap_pi(-3.0 * PI / 2.0) - PI / 2.0).abs() < EPS);
        assert!((wrap_pi(5.0 * TAU + 0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_ang_diff_crosses_boundary() {
        // 3.1 -> -3.1 is a short positive hop over the boundary, not a -6.2 swing
        let d = ang_diff(3.1f64, -3.1f64);
        assert!((d - (TAU - 6.2)).abs() < 1e-9);

        let d = ang_diff(-3.1f64, 3.1f64);
        assert!((d + (TAU - 6.2)).abs() < 1e-9);

        assert!((ang_diff(0.0f64, 1.0) - 1.0).abs() < EPS);
        assert!((ang_diff(1.0f64, 0.0) + 1.0).abs() < EPS);
    }

    #[test]
    fn test_sign_or_pos() {
        assert_eq!(sign_or_pos(0.0f64), 1.0);
        assert_eq!(sign_or_pos(-0.2f64), -1.0);
        assert_eq!(sign_or_pos(3.0f64), 1.0);
    }
}
