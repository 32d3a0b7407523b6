//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

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
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle in degrees into the range [-180, 180).
pub fn wrap_deg_180<T>(angle_deg: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap();
    let turn = T::from(360.0).unwrap();

    let wrapped = rem_euclid(angle_deg + half_turn, turn) - half_turn;

    // Round-off in rem_euclid can give exactly +180
    if wrapped >= half_turn { wrapped - turn } else { wrapped }
}

/// Get the signed shortest angular distance from `a` to `b`, in degrees.
///
/// The result is in the range [-180, 180).
pub fn ang_dist_deg<T>(a: T, b: T) -> T
where
    T: Float
{
    wrap_deg_180(b - a)
}

/// Round a value to the given number of decimal places.
pub fn round_dp<T>(value: T, decimal_places: i32) -> T
where
    T: Float
{
    let scale = T::from(10.0).unwrap().powi(decimal_places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_deg_180() {
        assert_eq!(wrap_deg_180(0f64), 0f64);
        assert_eq!(wrap_deg_180(180f64), -180f64);
        assert_eq!(wrap_deg_180(-180f64), -180f64);
        assert_eq!(wrap_deg_180(270f64), -90f64);
        assert_eq!(wrap_deg_180(-270f64), 90f64);
        assert_eq!(wrap_deg_180(720f64 + 45f64), 45f64);
    }

    #[test]
    fn test_ang_dist_deg() {
        assert_eq!(ang_dist_deg(10f64, 20f64), 10f64);
        assert_eq!(ang_dist_deg(20f64, 10f64), -10f64);
        assert_eq!(ang_dist_deg(170f64, -170f64), 20f64);
        assert_eq!(ang_dist_deg(-170f64, 170f64), -20f64);
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(1.23456f64, 3), 1.235f64);
        assert_eq!(round_dp(-90.0004f64, 3), -90.0f64);
    }
}
