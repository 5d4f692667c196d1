// Lossless float-width reduction (spec.md §4.3): narrow a float sequence
// 64->32->16 bits when the mantissa bits being dropped are all zero and the
// exponent range fits the narrower format. Oracle:
// pandasio/utils/numpy_compression.py::compress_float_array.

use half::f16;

#[derive(Debug, Clone, PartialEq)]
pub enum Reduced {
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// frexp-style unbiased exponent: `v == mantissa * 2^exponent` with
/// `mantissa` in `[0.5, 1)`. Subnormals are reported as a very negative
/// exponent, which is sufficient here since they always fail the bounded
/// range tests below.
fn frexp_exponent_f64(v: f64) -> i32 {
    if v == 0.0 {
        return 0;
    }
    let bits = v.to_bits();
    let exp_bits = ((bits >> 52) & 0x7ff) as i32;
    if exp_bits == 0 {
        return i32::MIN / 2;
    }
    exp_bits - 1022
}

fn frexp_exponent_f32(v: f32) -> i32 {
    if v == 0.0 {
        return 0;
    }
    let bits = v.to_bits();
    let exp_bits = ((bits >> 23) & 0xff) as i32;
    if exp_bits == 0 {
        return i32::MIN / 2;
    }
    exp_bits - 126
}

fn can_narrow_f64_to_f32(non_nan: &[f64]) -> bool {
    non_nan.iter().all(|v| {
        let bits = v.to_bits();
        let b0 = bits & 0xff;
        let b1 = (bits >> 8) & 0xff;
        let b2 = (bits >> 16) & 0xff;
        let b3 = (bits >> 24) & 0xff;
        let mantissa_zero = b0 == 0 && b1 == 0 && b2 == 0 && (b3 & 0x1f) == 0;
        let exp = frexp_exponent_f64(*v);
        mantissa_zero && (-128..=128).contains(&exp)
    })
}

fn can_narrow_f32_to_f16(non_nan: &[f32]) -> bool {
    non_nan.iter().all(|v| {
        let bits = v.to_bits();
        let b0 = bits & 0xff;
        let b1 = (bits >> 8) & 0xff;
        let mantissa_zero = b0 == 0 && (b1 & 0x1f) == 0;
        let exp = frexp_exponent_f32(*v);
        mantissa_zero && (-16..=16).contains(&exp)
    })
}

fn reduce_f32(vals: Vec<f32>) -> Reduced {
    let non_nan: Vec<f32> = vals.iter().copied().filter(|v| !v.is_nan()).collect();
    if non_nan.is_empty() {
        return Reduced::F16(vals.iter().map(|v| f16::from_f32(*v)).collect());
    }
    if can_narrow_f32_to_f16(&non_nan) {
        Reduced::F16(vals.iter().map(|v| f16::from_f32(*v)).collect())
    } else {
        Reduced::F32(vals)
    }
}

fn reduce_f64(vals: Vec<f64>) -> Reduced {
    let non_nan: Vec<f64> = vals.iter().copied().filter(|v| !v.is_nan()).collect();
    if non_nan.is_empty() {
        return Reduced::F16(vals.iter().map(|v| f16::from_f64(*v)).collect());
    }
    if can_narrow_f64_to_f32(&non_nan) {
        reduce_f32(vals.iter().map(|v| *v as f32).collect())
    } else {
        Reduced::F64(vals)
    }
}

/// Entry point: reduce a float sequence of any of the three on-disk widths.
/// `Reduced::F16` input passes through unchanged (spec.md §4.3 step 1).
pub fn reduce(input: Reduced) -> Reduced {
    match input {
        Reduced::F16(v) => Reduced::F16(v),
        Reduced::F32(v) => reduce_f32(v),
        Reduced::F64(v) => reduce_f64(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_all_nan_goes_to_f16() {
        assert!(matches!(reduce(Reduced::F64(vec![])), Reduced::F16(v) if v.is_empty()));
        assert!(matches!(
            reduce(Reduced::F64(vec![f64::NAN, f64::NAN])),
            Reduced::F16(v) if v.len() == 2 && v.iter().all(|x| x.is_nan())
        ));
    }

    #[test]
    fn width2_passes_through_unchanged() {
        let v = vec![f16::from_f32(1.5), f16::from_f32(-2.0)];
        assert_eq!(reduce(Reduced::F16(v.clone())), Reduced::F16(v));
    }

    #[test]
    fn exact_powers_of_two_narrow_all_the_way() {
        // 2.0, 4.0 ... 65536.0 have zero mantissa and small exponents: they
        // should narrow from f64 down to f16.
        let vals: Vec<f64> = (1..=16).map(|i| 2f64.powi(i)).collect();
        match reduce(Reduced::F64(vals.clone())) {
            Reduced::F16(v) => {
                for (a, b) in vals.iter().zip(v.iter()) {
                    assert_eq!(*a, b.to_f64());
                }
            }
            other => panic!("expected F16, got {:?}", other),
        }
    }

    #[test]
    fn nonzero_low_mantissa_bits_block_narrowing() {
        let vals = vec![1.0 + f64::EPSILON];
        assert_eq!(reduce(Reduced::F64(vals.clone())), Reduced::F64(vals));
    }

    #[test]
    fn large_exponent_blocks_f64_to_f32_narrowing() {
        // 2^200 has a zero mantissa but an exponent outside +-128.
        let vals = vec![2f64.powi(200)];
        assert_eq!(reduce(Reduced::F64(vals.clone())), Reduced::F64(vals));
    }

    #[test]
    fn f32_narrows_to_f16_within_bounds() {
        let vals = vec![3.0f32, -8.0f32];
        match reduce(Reduced::F32(vals.clone())) {
            Reduced::F16(v) => {
                for (a, b) in vals.iter().zip(v.iter()) {
                    assert_eq!(*a, b.to_f32());
                }
            }
            other => panic!("expected F16, got {:?}", other),
        }
    }

    #[test]
    fn f32_large_exponent_stays_f32() {
        let vals = vec![2f32.powi(100)];
        assert_eq!(reduce(Reduced::F32(vals.clone())), Reduced::F32(vals));
    }
}
