// Byte-width calculators (spec.md §4.2): given a signed or unsigned integer
// value, return the minimum power-of-two byte width (1, 2, 4, 8) that holds
// it. Oracle: pandasio/utils/binary.py.

use crate::error::{coldb_err, Kind as EKind};
use submerge_base::Result;

/// Smallest `b in {1,2,4,8}` such that `v < 2^(8b)`.
pub fn required_bytes_unsigned(v: i128) -> Result<u8> {
    if v < 0 {
        return Err(coldb_err(
            EKind::NegativeUnsigned,
            format!("{} is negative, not a valid unsigned magnitude", v),
        ));
    }
    if v >> 8 == 0 {
        return Ok(1);
    }
    if v >> 16 == 0 {
        return Ok(2);
    }
    if v >> 32 == 0 {
        return Ok(4);
    }
    if v >> 64 == 0 {
        return Ok(8);
    }
    Err(coldb_err(
        EKind::ExceedsU64,
        format!("{} exceeds the 64-bit unsigned range", v),
    ))
}

/// Smallest `b in {1,2,4,8}` such that the two's-complement magnitude of `v`
/// fits in `8b` bits. For negative `v` the magnitude tested is `-v - 1`
/// (spec.md §4.2); for non-negative `v` (as `array::compress` calls this with
/// an already-non-negative magnitude) no such adjustment is made, matching
/// the oracle's `determine_required_bytes_signed_integer` exactly — see
/// DESIGN.md for the resulting (intentional) off-by-one at the most-negative
/// boundary of each width.
pub fn required_bytes_signed(v: i128) -> Result<u8> {
    let magnitude = if v < 0 { (-v) - 1 } else { v };
    if magnitude >> 7 == 0 {
        return Ok(1);
    }
    if magnitude >> 15 == 0 {
        return Ok(2);
    }
    if magnitude >> 31 == 0 {
        return Ok(4);
    }
    if magnitude >> 63 == 0 {
        return Ok(8);
    }
    Err(coldb_err(
        EKind::ExceedsI64,
        format!("{} exceeds the 64-bit signed range", v),
    ))
}
