// Fixed-point rounding (spec.md §4.4): scale a float array by 10^decimals
// and round to the nearest integer, ties to even -- matching numpy's
// `around`, not Rust's native `f64::round` (which rounds ties away from
// zero). Oracle: pandasio/utils/numpy_compression.py::round_array_returning_integers.

use crate::error::{coldb_err, Kind as EKind};
use submerge_base::Result;

/// Round half to even. `x` is assumed finite; NaN/infinite inputs are
/// rejected by the caller before scaling.
fn round_half_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else {
        // Exactly halfway: round to the even neighbor.
        if (floor.rem_euclid(2.0)) == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    }
}

/// Multiply every element by `10^decimals` and round half-to-even to the
/// nearest `i64`. `decimals` must be non-negative.
pub fn round_to_int(vals: &[f64], decimals: i32) -> Result<Vec<i64>> {
    if decimals < 0 {
        return Err(coldb_err(
            EKind::NegativeDecimals,
            format!("decimals must be >= 0, got {}", decimals),
        ));
    }
    let scale = 10f64.powi(decimals);
    vals.iter()
        .map(|v| {
            if !v.is_finite() {
                return Err(coldb_err(
                    EKind::NotInteger,
                    format!("{} has no finite fixed-point representation", v),
                ));
            }
            let rounded = round_half_even(v * scale);
            if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
                return Err(coldb_err(
                    EKind::NotInteger,
                    format!("{} scaled by 10^{} overflows i64", v, decimals),
                ));
            }
            Ok(rounded as i64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_round_to_even() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(-0.5), 0.0);
        assert_eq!(round_half_even(-1.5), -2.0);
    }

    #[test]
    fn non_ties_round_normally() {
        assert_eq!(round_half_even(1.2), 1.0);
        assert_eq!(round_half_even(1.8), 2.0);
        assert_eq!(round_half_even(-1.2), -1.0);
        assert_eq!(round_half_even(-1.8), -2.0);
    }

    #[test]
    fn scales_before_rounding() {
        // 1.25 and 3.75 scale to the binary-exact halves 12.5 and 37.5;
        // half-to-even sends them to the nearest even integers 12 and 38.
        let out = round_to_int(&[1.25, 3.75], 1).unwrap();
        assert_eq!(out, vec![12, 38]);
    }

    #[test]
    fn rejects_negative_decimals() {
        assert!(round_to_int(&[1.0], -1).is_err());
    }

    #[test]
    fn rejects_non_finite_input() {
        assert!(round_to_int(&[f64::NAN], 0).is_err());
        assert!(round_to_int(&[f64::INFINITY], 0).is_err());
    }

    #[test]
    fn zero_decimals_is_plain_rounding() {
        assert_eq!(round_to_int(&[2.5, 3.5, -2.5], 0).unwrap(), vec![2, 4, -2]);
    }
}
