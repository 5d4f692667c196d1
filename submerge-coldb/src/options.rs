// The per-column options bitfield (spec.md §4.6 / §6): 16 bits, of which
// four are named flags. Oracle: pandabar.py::_PandaBar._encode_options /
// _decode_options.

use crate::array::CompressionMode;
use crate::error::{coldb_err, Kind as EKind};
use submerge_base::Result;

const BIT_IS_INDEX: u16 = 1 << 0;
const BIT_USE_COMPRESSION: u16 = 1 << 1;
const BIT_USE_HASH_TABLE: u16 = 1 << 2;
const BIT_USE_FLOATING_POINT_ROUNDING: u16 = 1 << 3;

/// The decoded form of a column's 16-bit options field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnOptions {
    pub is_index: bool,
    pub use_compression: bool,
    pub use_hash_table: bool,
    pub use_floating_point_rounding: bool,
}

impl ColumnOptions {
    pub fn decode(bits: u16) -> Self {
        Self {
            is_index: bits & BIT_IS_INDEX != 0,
            use_compression: bits & BIT_USE_COMPRESSION != 0,
            use_hash_table: bits & BIT_USE_HASH_TABLE != 0,
            use_floating_point_rounding: bits & BIT_USE_FLOATING_POINT_ROUNDING != 0,
        }
    }

    pub fn encode(self) -> u16 {
        let mut bits = 0u16;
        if self.is_index {
            bits |= BIT_IS_INDEX;
        }
        if self.use_compression {
            bits |= BIT_USE_COMPRESSION;
        }
        if self.use_hash_table {
            bits |= BIT_USE_HASH_TABLE;
        }
        if self.use_floating_point_rounding {
            bits |= BIT_USE_FLOATING_POINT_ROUNDING;
        }
        bits
    }

    /// `use_hash_table` has no writer and no reader support: this crate
    /// never sets it on encode, and rejects it on decode.
    pub fn reject_hash_table(self) -> Result<()> {
        if self.use_hash_table {
            Err(coldb_err(
                EKind::HashTableNotImplemented,
                "use_hash_table is set but hash-table columns are not implemented",
            ))
        } else {
            Ok(())
        }
    }

    /// `use_compression` implies a mode byte follows in the detail bytes;
    /// `CompressionMode::None` is only valid when this flag is unset.
    pub fn compression_mode_for(self, byte: u8) -> Result<CompressionMode> {
        if !self.use_compression {
            return Ok(CompressionMode::None);
        }
        CompressionMode::from_byte(byte)
    }
}
