// The array compressor (spec.md §4.5): element-wise delta ('e') and
// minimum-offset delta ('m') transforms over a typed numeric array, plus
// the 'n' (no compression) passthrough. Oracle:
// pandasio/utils/numpy_compression.py::compress_array / decompress_array.

use half::f16;
use ordered_float::OrderedFloat;

use crate::error::{coldb_err, Kind as EKind};
use crate::floatreduce::{self, Reduced};
use crate::kind::Kind;
use crate::width::{required_bytes_signed, required_bytes_unsigned};
use submerge_base::Result;

/// A typed, in-memory column payload. One variant per (kind, width) pair in
/// the type registry (spec.md §4.1).
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Array {
    pub fn kind(&self) -> Kind {
        match self {
            Array::I8(_) | Array::I16(_) | Array::I32(_) | Array::I64(_) => Kind::Signed,
            Array::U8(_) | Array::U16(_) | Array::U32(_) | Array::U64(_) => Kind::Unsigned,
            Array::F16(_) | Array::F32(_) | Array::F64(_) => Kind::Float,
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            Array::I8(_) | Array::U8(_) => 8,
            Array::I16(_) | Array::U16(_) | Array::F16(_) => 16,
            Array::I32(_) | Array::U32(_) | Array::F32(_) => 32,
            Array::I64(_) | Array::U64(_) | Array::F64(_) => 64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Array::I8(v) => v.len(),
            Array::I16(v) => v.len(),
            Array::I32(v) => v.len(),
            Array::I64(v) => v.len(),
            Array::U8(v) => v.len(),
            Array::U16(v) => v.len(),
            Array::U32(v) => v.len(),
            Array::U64(v) => v.len(),
            Array::F16(v) => v.len(),
            Array::F32(v) => v.len(),
            Array::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen every element to `i128`. Only valid for the integer kinds.
    pub(crate) fn to_i128(&self) -> Result<Vec<i128>> {
        match self {
            Array::I8(v) => Ok(v.iter().map(|x| *x as i128).collect()),
            Array::I16(v) => Ok(v.iter().map(|x| *x as i128).collect()),
            Array::I32(v) => Ok(v.iter().map(|x| *x as i128).collect()),
            Array::I64(v) => Ok(v.iter().map(|x| *x as i128).collect()),
            Array::U8(v) => Ok(v.iter().map(|x| *x as i128).collect()),
            Array::U16(v) => Ok(v.iter().map(|x| *x as i128).collect()),
            Array::U32(v) => Ok(v.iter().map(|x| *x as i128).collect()),
            Array::U64(v) => Ok(v.iter().map(|x| *x as i128).collect()),
            _ => Err(coldb_err(
                EKind::CompressionKindInvalid,
                "array compressor delta math requires an integer array",
            )),
        }
    }

    /// Widen every element to `f64`. Only valid for the float kinds.
    pub(crate) fn to_f64(&self) -> Result<Vec<f64>> {
        match self {
            Array::F16(v) => Ok(v.iter().map(|x| x.to_f64()).collect()),
            Array::F32(v) => Ok(v.iter().map(|x| *x as f64).collect()),
            Array::F64(v) => Ok(v.clone()),
            _ => Err(coldb_err(
                EKind::CompressionKindInvalid,
                "array compressor delta math requires a float array",
            )),
        }
    }

    fn first(&self) -> Option<Array> {
        if self.is_empty() {
            return None;
        }
        Some(match self {
            Array::I8(v) => Array::I8(vec![v[0]]),
            Array::I16(v) => Array::I16(vec![v[0]]),
            Array::I32(v) => Array::I32(vec![v[0]]),
            Array::I64(v) => Array::I64(vec![v[0]]),
            Array::U8(v) => Array::U8(vec![v[0]]),
            Array::U16(v) => Array::U16(vec![v[0]]),
            Array::U32(v) => Array::U32(vec![v[0]]),
            Array::U64(v) => Array::U64(vec![v[0]]),
            Array::F16(v) => Array::F16(vec![v[0]]),
            Array::F32(v) => Array::F32(vec![v[0]]),
            Array::F64(v) => Array::F64(vec![v[0]]),
        })
    }

    fn single_i128(&self) -> Result<i128> {
        Ok(self.to_i128()?[0])
    }

    fn single_f64(&self) -> Result<f64> {
        Ok(self.to_f64()?[0])
    }
}

/// Build a signed integer array of the narrowest admissible width, given a
/// target width already computed by `required_bytes_signed`.
pub(crate) fn from_i128_signed(vals: &[i128], width_bytes: u8) -> Array {
    match width_bytes {
        1 => Array::I8(vals.iter().map(|v| *v as i8).collect()),
        2 => Array::I16(vals.iter().map(|v| *v as i16).collect()),
        4 => Array::I32(vals.iter().map(|v| *v as i32).collect()),
        _ => Array::I64(vals.iter().map(|v| *v as i64).collect()),
    }
}

fn from_i128_unsigned(vals: &[i128], width_bytes: u8) -> Array {
    match width_bytes {
        1 => Array::U8(vals.iter().map(|v| *v as u8).collect()),
        2 => Array::U16(vals.iter().map(|v| *v as u16).collect()),
        4 => Array::U32(vals.iter().map(|v| *v as u32).collect()),
        _ => Array::U64(vals.iter().map(|v| *v as u64).collect()),
    }
}

/// Rebuild an integer array of exactly `kind`/`bits`, e.g. when decoding a
/// residual or reference back into the column's declared on-disk type.
fn from_i128_typed(vals: &[i128], kind: Kind, bits: u32) -> Result<Array> {
    let width = (bits / 8) as u8;
    match kind {
        Kind::Signed => Ok(from_i128_signed(vals, width)),
        Kind::Unsigned => Ok(from_i128_unsigned(vals, width)),
        Kind::Float => Err(coldb_err(
            EKind::CompressionKindInvalid,
            "cannot rebuild a float array from integer deltas",
        )),
    }
}

fn reduced_to_array(r: Reduced) -> Array {
    match r {
        Reduced::F16(v) => Array::F16(v),
        Reduced::F32(v) => Array::F32(v),
        Reduced::F64(v) => Array::F64(v),
    }
}

fn from_f64_typed(vals: &[f64], bits: u32) -> Result<Array> {
    match bits {
        16 => Ok(Array::F16(vals.iter().map(|v| f16::from_f64(*v)).collect())),
        32 => Ok(Array::F32(vals.iter().map(|v| *v as f32).collect())),
        64 => Ok(Array::F64(vals.to_vec())),
        _ => Err(coldb_err(
            EKind::UnsupportedSize,
            format!("{} is not a valid float width", bits),
        )),
    }
}

/// The three on-disk compression modes (spec.md §4.5 / §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    None,
    ElementDelta,
    MinOffset,
}

impl CompressionMode {
    pub fn to_byte(self) -> u8 {
        match self {
            CompressionMode::None => b'n',
            CompressionMode::ElementDelta => b'e',
            CompressionMode::MinOffset => b'm',
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            b'n' => Ok(CompressionMode::None),
            b'e' => Ok(CompressionMode::ElementDelta),
            b'm' => Ok(CompressionMode::MinOffset),
            _ => Err(coldb_err(
                EKind::CompressionModeInvalid,
                format!("compression mode byte {:?} not in {{n,e,m}}", b as char),
            )),
        }
    }
}

/// The result of compressing an array: the chosen reference value (absent
/// for `CompressionMode::None`, or when the array has too few elements to
/// carry a meaningful delta) and the residual payload actually written.
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub mode: CompressionMode,
    pub reference: Option<Array>,
    pub residual: Array,
}

/// An array already at the narrowest width its kind can be: 1-byte integers
/// and 2-byte floats have no narrower on-disk representation to delta
/// against, so compression is always a no-op for them (spec.md §4.5).
fn is_already_minimal(arr: &Array) -> bool {
    matches!(arr, Array::I8(_) | Array::U8(_) | Array::F16(_))
}

/// Compress `arr` under `mode`. `arr`'s own kind/width become the "original"
/// kind/width the container header records; `decompress` is given those back
/// explicitly since the residual's kind/width may differ (e.g. an
/// element-delta residual is signed only when some delta is negative, and a
/// minimum-offset residual is always unsigned).
pub fn compress(arr: &Array, mode: CompressionMode) -> Result<Compressed> {
    if is_already_minimal(arr) {
        return Ok(Compressed {
            mode,
            reference: None,
            residual: arr.clone(),
        });
    }
    match mode {
        CompressionMode::None => Ok(Compressed {
            mode,
            reference: None,
            residual: arr.clone(),
        }),
        CompressionMode::ElementDelta => compress_element_delta(arr),
        CompressionMode::MinOffset => compress_min_offset(arr),
    }
}

fn compress_element_delta(arr: &Array) -> Result<Compressed> {
    // Fewer than two elements: no predecessor to diff against. Store the
    // array unchanged, tagged with the requested mode, and no reference.
    if arr.len() < 2 {
        return Ok(Compressed {
            mode: CompressionMode::ElementDelta,
            reference: None,
            residual: arr.clone(),
        });
    }
    let reference = arr.first();
    match arr.kind() {
        Kind::Float => {
            let vals = arr.to_f64()?;
            let diffs: Vec<f64> = vals.windows(2).map(|w| w[1] - w[0]).collect();
            let reduced = floatreduce::reduce(Reduced::F64(diffs));
            Ok(Compressed {
                mode: CompressionMode::ElementDelta,
                reference,
                residual: reduced_to_array(reduced),
            })
        }
        Kind::Signed | Kind::Unsigned => {
            let vals = arr.to_i128()?;
            let diffs: Vec<i128> = vals.windows(2).map(|w| w[1] - w[0]).collect();
            let max_diff = diffs.iter().copied().max().unwrap_or(0);
            let min_diff = diffs.iter().copied().min().unwrap_or(0);
            // Oracle: type_char = 'i' if min_value < 0 else 'u' -- only
            // fall back to a signed residual when some delta is negative.
            if min_diff.is_negative() {
                // See width.rs: pass a non-negative magnitude so the
                // oracle's off-by-one at the most-negative boundary is
                // reproduced, not corrected.
                let max_abs = max_diff.max(0).max(-min_diff);
                let width = required_bytes_signed(max_abs)?;
                Ok(Compressed {
                    mode: CompressionMode::ElementDelta,
                    reference,
                    residual: from_i128_signed(&diffs, width),
                })
            } else {
                let width = required_bytes_unsigned(max_diff)?;
                Ok(Compressed {
                    mode: CompressionMode::ElementDelta,
                    reference,
                    residual: from_i128_unsigned(&diffs, width),
                })
            }
        }
    }
}

fn compress_min_offset(arr: &Array) -> Result<Compressed> {
    if arr.is_empty() {
        return Ok(Compressed {
            mode: CompressionMode::MinOffset,
            reference: None,
            residual: arr.clone(),
        });
    }
    match arr.kind() {
        Kind::Float => {
            let vals = arr.to_f64()?;
            let min_val = vals.iter().copied().map(OrderedFloat).min().unwrap().0;
            let diffs: Vec<f64> = vals.iter().map(|v| v - min_val).collect();
            let reduced = floatreduce::reduce(Reduced::F64(diffs));
            let reference = from_f64_typed(&[min_val], arr.bits())?;
            Ok(Compressed {
                mode: CompressionMode::MinOffset,
                reference: Some(reference),
                residual: reduced_to_array(reduced),
            })
        }
        Kind::Signed | Kind::Unsigned => {
            let vals = arr.to_i128()?;
            let min_val = *vals.iter().min().unwrap();
            let diffs: Vec<i128> = vals.iter().map(|v| v - min_val).collect();
            let max_diff = diffs.iter().copied().max().unwrap_or(0);
            let width = required_bytes_unsigned(max_diff)?;
            let reference = from_i128_typed(&[min_val], arr.kind(), arr.bits())?;
            Ok(Compressed {
                mode: CompressionMode::MinOffset,
                reference: Some(reference),
                residual: from_i128_unsigned(&diffs, width),
            })
        }
    }
}

/// Reverse `compress`: given the mode, optional reference, residual, and the
/// column's declared original kind/width, rebuild the original array.
pub fn decompress(
    mode: CompressionMode,
    reference: Option<&Array>,
    residual: &Array,
    original_kind: Kind,
    original_bits: u32,
) -> Result<Array> {
    match mode {
        CompressionMode::None => Ok(residual.clone()),
        CompressionMode::ElementDelta => decompress_element_delta(reference, residual, original_kind, original_bits),
        CompressionMode::MinOffset => decompress_min_offset(reference, residual, original_kind, original_bits),
    }
}

fn decompress_element_delta(
    reference: Option<&Array>,
    residual: &Array,
    original_kind: Kind,
    original_bits: u32,
) -> Result<Array> {
    let Some(reference) = reference else {
        // No reference means compress bypassed (len < 2): residual already
        // holds the original values.
        return Ok(residual.clone());
    };
    match original_kind {
        Kind::Float => {
            let first = reference.single_f64()?;
            let diffs = residual.to_f64()?;
            let mut out = Vec::with_capacity(diffs.len() + 1);
            out.push(first);
            let mut running = first;
            for d in diffs {
                running += d;
                out.push(running);
            }
            from_f64_typed(&out, original_bits)
        }
        Kind::Signed | Kind::Unsigned => {
            let first = reference.single_i128()?;
            let diffs = residual.to_i128()?;
            let mut out = Vec::with_capacity(diffs.len() + 1);
            out.push(first);
            let mut running = first;
            for d in diffs {
                running += d;
                out.push(running);
            }
            from_i128_typed(&out, original_kind, original_bits)
        }
    }
}

fn decompress_min_offset(
    reference: Option<&Array>,
    residual: &Array,
    original_kind: Kind,
    original_bits: u32,
) -> Result<Array> {
    let Some(reference) = reference else {
        return Ok(residual.clone());
    };
    match original_kind {
        Kind::Float => {
            let min_val = reference.single_f64()?;
            let diffs = residual.to_f64()?;
            let out: Vec<f64> = diffs.iter().map(|d| d + min_val).collect();
            from_f64_typed(&out, original_bits)
        }
        Kind::Signed | Kind::Unsigned => {
            let min_val = reference.single_i128()?;
            let diffs = residual.to_i128()?;
            let out: Vec<i128> = diffs.iter().map(|d| d + min_val).collect();
            from_i128_typed(&out, original_kind, original_bits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_delta_round_trips_signed() {
        let arr = Array::I32(vec![10, 12, 9, 9, 500]);
        let c = compress(&arr, CompressionMode::ElementDelta).unwrap();
        assert_eq!(c.mode, CompressionMode::ElementDelta);
        // diffs are 2, -3, 0, 491 -- fits in i16.
        assert!(matches!(c.residual, Array::I16(_)));
        let back = decompress(c.mode, c.reference.as_ref(), &c.residual, Kind::Signed, 32).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn element_delta_bypassed_below_two_elements() {
        let arr = Array::U8(vec![7]);
        let c = compress(&arr, CompressionMode::ElementDelta).unwrap();
        assert!(c.reference.is_none());
        assert_eq!(c.residual, arr);
        let back = decompress(c.mode, c.reference.as_ref(), &c.residual, Kind::Unsigned, 8).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn min_offset_round_trips_unsigned_residual_from_signed_input() {
        let arr = Array::I32(vec![-5, 0, 10, -5, 3]);
        let c = compress(&arr, CompressionMode::MinOffset).unwrap();
        assert_eq!(c.mode, CompressionMode::MinOffset);
        // range is 15, fits u8.
        assert!(matches!(c.residual, Array::U8(_)));
        assert_eq!(c.reference, Some(Array::I32(vec![-5])));
        let back = decompress(c.mode, c.reference.as_ref(), &c.residual, Kind::Signed, 32).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn min_offset_on_empty_array_is_a_no_op() {
        let arr = Array::U16(vec![]);
        let c = compress(&arr, CompressionMode::MinOffset).unwrap();
        assert!(c.reference.is_none());
        assert_eq!(c.residual, arr);
    }

    #[test]
    fn none_mode_is_identity() {
        let arr = Array::F64(vec![1.0, 2.0, 3.0]);
        let c = compress(&arr, CompressionMode::None).unwrap();
        assert!(c.reference.is_none());
        assert_eq!(c.residual, arr);
        let back = decompress(c.mode, c.reference.as_ref(), &c.residual, Kind::Float, 64).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn element_delta_round_trips_float_with_narrowing() {
        let arr = Array::F64(vec![1.0, 3.0, 3.0, -5.0]);
        let c = compress(&arr, CompressionMode::ElementDelta).unwrap();
        // diffs are 2.0, 0.0, -8.0: all exactly representable at f16.
        assert!(matches!(c.residual, Array::F16(_)));
        let back = decompress(c.mode, c.reference.as_ref(), &c.residual, Kind::Float, 64).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn mode_byte_round_trip() {
        for m in [
            CompressionMode::None,
            CompressionMode::ElementDelta,
            CompressionMode::MinOffset,
        ] {
            assert_eq!(CompressionMode::from_byte(m.to_byte()).unwrap(), m);
        }
        assert!(CompressionMode::from_byte(b'x').is_err());
    }
}
