// Column codec (spec.md §4.6): header layout (identifier + 40-byte fixed
// definition: 16-bit options, bytes_per_value, kind byte, 32-bit extra_bytes,
// 32 detail bytes) and the encode/decode orchestration -- round, then
// compress, then emit; decode reverses. Oracle: pandabar.py::_PandaBar.

use crate::array::{self, Array, CompressionMode};
use crate::error::{coldb_err, Kind as EKind};
use crate::ioutil::{self, Reader, Writer};
use crate::kind::Kind;
use crate::options::ColumnOptions;
use crate::round;
use crate::width::required_bytes_signed;
use submerge_base::Result;

/// Size in bytes of a column's fixed definition, not counting its
/// identifier: 2 (options) + 1 (bytes_per_value) + 1 (kind) + 4 (extra_bytes)
/// + 32 (detail bytes).
pub const DEFINITION_BYTES_WITHOUT_IDENTIFIER: usize = 40;
const DETAIL_BYTES: usize = 32;

/// A fully decoded column: identifier, options, and the logical data the
/// caller handed in (or gets back out) -- never the on-disk compressed
/// residual, which is an implementation detail of `encode`/`decode`.
///
/// `compression` and `decimals` are the caller's *requested* write-time
/// settings; they're ignored when a `Column` comes back from `Container`
/// reads (the on-disk options byte is authoritative there).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub identifier: String,
    pub is_index: bool,
    pub data: Array,
    pub compression: CompressionMode,
    pub decimals: Option<u8>,
}

impl Column {
    pub fn new(identifier: impl Into<String>, is_index: bool, data: Array) -> Self {
        Self {
            identifier: identifier.into(),
            is_index,
            data,
            compression: CompressionMode::None,
            decimals: None,
        }
    }

    pub fn with_compression(mut self, mode: CompressionMode) -> Self {
        self.compression = mode;
        self
    }

    pub fn with_rounding(mut self, decimals: u8) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }
}

/// The on-disk encoding of one column, ready to be written to (or as read
/// from) the container's column-definition table and data region. Computed
/// once by `encode` and then handed to `write_definition`/`write_payload`
/// separately, since the container lays out every definition before any
/// payload (spec.md §6).
pub struct EncodedColumn {
    pub identifier: String,
    options: ColumnOptions,
    declared_kind: Kind,
    declared_bits: u32,
    decimals: u8,
    mode: CompressionMode,
    reference: Option<Array>,
    residual: Array,
    payload: Vec<u8>,
}

impl EncodedColumn {
    pub fn payload_len(&self) -> u32 {
        self.payload.len() as u32
    }
}

/// Round `data` to fixed point at `decimals` digits and pick the narrowest
/// signed width that holds every rounded value. Only valid for float data.
fn round_to_declared(data: &Array, decimals: u8) -> Result<(Kind, u32, Array)> {
    let vals = data.to_f64()?;
    let rounded = round::round_to_int(&vals, decimals as i32)?;
    let width = rounded
        .iter()
        .map(|v| required_bytes_signed(*v as i128))
        .try_fold(1u8, |acc, w| w.map(|w| acc.max(w)))?;
    let as_i128: Vec<i128> = rounded.iter().map(|v| *v as i128).collect();
    let arr = array::from_i128_signed(&as_i128, width);
    Ok((Kind::Signed, width as u32 * 8, arr))
}

/// Round (if requested), compress, and serialize `col`'s payload bytes.
/// Does not touch any writer -- `write_definition`/`write_payload` do that
/// from the result, so the container can lay out the whole definition table
/// before any payload bytes.
pub fn encode(col: &Column, identifier_width: usize) -> Result<EncodedColumn> {
    if col.identifier.len() > identifier_width {
        return Err(coldb_err(
            EKind::IdentifierByteRepresentation,
            format!(
                "identifier {:?} is longer than the container's identifier width {}",
                col.identifier, identifier_width
            ),
        ));
    }
    let (declared_kind, declared_bits, declared_data, use_rounding) = match col.decimals {
        Some(d) => {
            let (k, b, arr) = round_to_declared(&col.data, d)?;
            (k, b, arr, true)
        }
        None => (col.data.kind(), col.data.bits(), col.data.clone(), false),
    };
    let use_compression = col.compression != CompressionMode::None;
    let compressed = array::compress(&declared_data, col.compression)?;
    let options = ColumnOptions {
        is_index: col.is_index,
        use_compression,
        use_hash_table: false,
        use_floating_point_rounding: use_rounding,
    };
    let payload = encode_payload_bytes(&compressed.residual);
    Ok(EncodedColumn {
        identifier: col.identifier.clone(),
        options,
        declared_kind,
        declared_bits,
        decimals: col.decimals.unwrap_or(0),
        mode: compressed.mode,
        reference: compressed.reference,
        residual: compressed.residual,
        payload,
    })
}

fn kind_byte(kind: Kind) -> u8 {
    kind.to_byte()
}

fn residual_element_count(mode: CompressionMode, reference: &Option<Array>, row_count: usize) -> usize {
    match mode {
        CompressionMode::ElementDelta if reference.is_some() => row_count.saturating_sub(1),
        _ => row_count,
    }
}

/// Write a column's identifier (padded to `identifier_width` bytes) followed
/// by its fixed 40-byte definition.
pub fn write_definition(w: &mut impl Writer, enc: &EncodedColumn, identifier_width: usize) -> Result<()> {
    let mut id_bytes = enc.identifier.clone().into_bytes();
    id_bytes.resize(identifier_width, 0);
    ioutil::write_bytes(w, &id_bytes).map_err(submerge_base::Error::from)?;

    ioutil::write_u16_le(w, enc.options.encode()).map_err(submerge_base::Error::from)?;
    ioutil::write_u8(w, (enc.declared_bits / 8) as u8).map_err(submerge_base::Error::from)?;
    ioutil::write_u8(w, kind_byte(enc.declared_kind)).map_err(submerge_base::Error::from)?;
    ioutil::write_u32_le(w, enc.payload_len()).map_err(submerge_base::Error::from)?;

    let mut detail = [0u8; DETAIL_BYTES];
    detail[0] = enc.mode.to_byte();
    detail[1] = enc.reference.is_some() as u8;
    detail[2] = (enc.residual.bits() / 8) as u8;
    detail[3] = enc.decimals;
    if let Some(reference) = &enc.reference {
        let ref_bytes = encode_reference_bytes(reference)?;
        detail[4..4 + ref_bytes.len()].copy_from_slice(&ref_bytes);
    }
    // The residual's own kind, not inferred from mode/declared_kind: an
    // element-delta residual can be signed or unsigned depending on whether
    // any delta came out negative (spec.md §4.5).
    detail[12] = kind_byte(enc.residual.kind());
    ioutil::write_bytes(w, &detail).map_err(submerge_base::Error::from)?;
    Ok(())
}

fn encode_reference_bytes(reference: &Array) -> Result<Vec<u8>> {
    match reference {
        Array::I8(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::I16(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::I32(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::I64(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::U8(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::U16(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::U32(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::U64(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::F16(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::F32(v) => Ok(v[0].to_le_bytes().to_vec()),
        Array::F64(v) => Ok(v[0].to_le_bytes().to_vec()),
    }
}

fn decode_reference_bytes(bytes: &[u8], kind: Kind, bits: u32) -> Result<Array> {
    match (kind, bits) {
        (Kind::Signed, 8) => Ok(Array::I8(vec![bytes[0] as i8])),
        (Kind::Signed, 16) => Ok(Array::I16(vec![i16::from_le_bytes(bytes[0..2].try_into().unwrap())])),
        (Kind::Signed, 32) => Ok(Array::I32(vec![i32::from_le_bytes(bytes[0..4].try_into().unwrap())])),
        (Kind::Signed, 64) => Ok(Array::I64(vec![i64::from_le_bytes(bytes[0..8].try_into().unwrap())])),
        (Kind::Unsigned, 8) => Ok(Array::U8(vec![bytes[0]])),
        (Kind::Unsigned, 16) => Ok(Array::U16(vec![u16::from_le_bytes(bytes[0..2].try_into().unwrap())])),
        (Kind::Unsigned, 32) => Ok(Array::U32(vec![u32::from_le_bytes(bytes[0..4].try_into().unwrap())])),
        (Kind::Unsigned, 64) => Ok(Array::U64(vec![u64::from_le_bytes(bytes[0..8].try_into().unwrap())])),
        (Kind::Float, 16) => Ok(Array::F16(vec![half::f16::from_le_bytes(
            bytes[0..2].try_into().unwrap(),
        )])),
        (Kind::Float, 32) => Ok(Array::F32(vec![f32::from_le_bytes(bytes[0..4].try_into().unwrap())])),
        (Kind::Float, 64) => Ok(Array::F64(vec![f64::from_le_bytes(bytes[0..8].try_into().unwrap())])),
        _ => Err(coldb_err(
            EKind::UnsupportedSize,
            format!("no type for kind {:?} at {} bits", kind, bits),
        )),
    }
}

/// Write just the payload bytes for a previously-written definition. Kept
/// separate from `write_definition` so the container can lay out the full
/// definition table before any payload bytes (spec.md §6 file layout).
pub fn write_payload(w: &mut impl Writer, enc: &EncodedColumn) -> Result<()> {
    ioutil::write_bytes(w, &enc.payload).map_err(submerge_base::Error::from)
}

fn encode_payload_bytes(residual: &Array) -> Vec<u8> {
    match residual {
        Array::I8(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Array::I16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Array::I32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Array::I64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Array::U8(v) => v.to_vec(),
        Array::U16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Array::U32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Array::U64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Array::F16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Array::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Array::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
    }
}

fn decode_payload_bytes(bytes: &[u8], kind: Kind, bits: u32, count: usize) -> Result<Array> {
    let width = (bits / 8) as usize;
    if bytes.len() != width * count {
        return Err(coldb_err(
            EKind::ShapeMismatch,
            format!(
                "payload is {} bytes, expected {} ({} elements x {} bytes)",
                bytes.len(),
                width * count,
                count,
                width
            ),
        ));
    }
    Ok(match (kind, bits) {
        (Kind::Signed, 8) => Array::I8(bytes.iter().map(|b| *b as i8).collect()),
        (Kind::Signed, 16) => Array::I16(bytes.chunks_exact(2).map(|c| i16::from_le_bytes(c.try_into().unwrap())).collect()),
        (Kind::Signed, 32) => Array::I32(bytes.chunks_exact(4).map(|c| i32::from_le_bytes(c.try_into().unwrap())).collect()),
        (Kind::Signed, 64) => Array::I64(bytes.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().unwrap())).collect()),
        (Kind::Unsigned, 8) => Array::U8(bytes.to_vec()),
        (Kind::Unsigned, 16) => Array::U16(bytes.chunks_exact(2).map(|c| u16::from_le_bytes(c.try_into().unwrap())).collect()),
        (Kind::Unsigned, 32) => Array::U32(bytes.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect()),
        (Kind::Unsigned, 64) => Array::U64(bytes.chunks_exact(8).map(|c| u64::from_le_bytes(c.try_into().unwrap())).collect()),
        (Kind::Float, 16) => Array::F16(
            bytes
                .chunks_exact(2)
                .map(|c| half::f16::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        (Kind::Float, 32) => Array::F32(bytes.chunks_exact(4).map(|c| f32::from_le_bytes(c.try_into().unwrap())).collect()),
        (Kind::Float, 64) => Array::F64(bytes.chunks_exact(8).map(|c| f64::from_le_bytes(c.try_into().unwrap())).collect()),
        _ => {
            return Err(coldb_err(
                EKind::UnsupportedSize,
                format!("no type for kind {:?} at {} bits", kind, bits),
            ))
        }
    })
}

/// One column's parsed, but not yet payload-resolved, definition.
pub struct ColumnHeader {
    pub identifier: String,
    pub options: ColumnOptions,
    pub declared_bits: u32,
    pub declared_kind: Kind,
    pub payload_len: u32,
    mode_byte: u8,
    has_reference: bool,
    residual_bits: u32,
    residual_kind: Kind,
    decimals: u8,
    reference_bytes: [u8; DETAIL_BYTES - 4],
}

pub fn read_header(r: &mut impl Reader, identifier_width: usize) -> Result<ColumnHeader> {
    let id_bytes = ioutil::read_exact_vec(r, identifier_width).map_err(submerge_base::Error::from)?;
    let identifier = String::from_utf8(id_bytes.into_iter().take_while(|b| *b != 0).collect())
        .map_err(submerge_base::Error::from)?;

    let options = ColumnOptions::decode(ioutil::read_u16_le(r).map_err(submerge_base::Error::from)?);
    options.reject_hash_table()?;
    let declared_width = ioutil::read_u8(r).map_err(submerge_base::Error::from)?;
    let declared_kind = Kind::from_byte(ioutil::read_u8(r).map_err(submerge_base::Error::from)?)?;
    let payload_len = ioutil::read_u32_le(r).map_err(submerge_base::Error::from)?;
    declared_kind.validate_bits(declared_width as u32 * 8)?;

    let detail = ioutil::read_exact_vec(r, DETAIL_BYTES).map_err(submerge_base::Error::from)?;
    let mode_byte = detail[0];
    let has_reference = detail[1] != 0;
    let residual_bits = detail[2] as u32 * 8;
    let decimals = detail[3];
    let residual_kind = Kind::from_byte(detail[12])?;
    let mut reference_bytes = [0u8; DETAIL_BYTES - 4];
    reference_bytes.copy_from_slice(&detail[4..DETAIL_BYTES]);

    Ok(ColumnHeader {
        identifier,
        options,
        declared_bits: declared_width as u32 * 8,
        declared_kind,
        payload_len,
        mode_byte,
        has_reference,
        residual_bits,
        residual_kind,
        decimals,
        reference_bytes,
    })
}

pub fn read_payload(r: &mut impl Reader, header: &ColumnHeader, row_count: usize, is_index: bool) -> Result<Column> {
    let mode = header.options.compression_mode_for(header.mode_byte)?;

    let reference = if header.has_reference {
        Some(decode_reference_bytes(
            &header.reference_bytes,
            header.declared_kind,
            header.declared_bits,
        )?)
    } else {
        None
    };

    // The residual's kind is recorded explicitly at encode time: an
    // element-delta residual is signed only when some delta was negative,
    // so it can't be inferred from mode/declared_kind alone.
    let residual_kind = header.residual_kind;
    let residual_count = residual_element_count(mode, &reference, row_count);
    let payload_bytes = ioutil::read_exact_vec(r, header.payload_len as usize).map_err(submerge_base::Error::from)?;
    let residual = decode_payload_bytes(&payload_bytes, residual_kind, header.residual_bits, residual_count)?;

    let declared = array::decompress(mode, reference.as_ref(), &residual, header.declared_kind, header.declared_bits)?;
    let data = if header.options.use_floating_point_rounding {
        let scale = 10f64.powi(header.decimals as i32);
        let ints = declared.to_i128()?;
        Array::F64(ints.iter().map(|v| *v as f64 / scale).collect())
    } else {
        declared
    };

    Ok(Column {
        identifier: header.identifier.clone(),
        is_index,
        data,
        compression: mode,
        decimals: if header.options.use_floating_point_rounding {
            Some(header.decimals)
        } else {
            None
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioutil::{MemReader, MemWriter};

    fn round_trip(col: &Column, identifier_width: usize) -> Column {
        let enc = encode(col, identifier_width).unwrap();
        let mut w = MemWriter::new();
        write_definition(&mut w, &enc, identifier_width).unwrap();
        write_payload(&mut w, &enc).unwrap();
        let mut r: MemReader = w.into_reader();
        let header = read_header(&mut r, identifier_width).unwrap();
        read_payload(&mut r, &header, col.row_count(), col.is_index).unwrap()
    }

    #[test]
    fn plain_integer_column_round_trips() {
        let col = Column::new("price", false, Array::I32(vec![10, 20, 30]));
        let back = round_trip(&col, 16);
        assert_eq!(back.data, col.data);
        assert_eq!(back.identifier, "price");
    }

    #[test]
    fn compressed_integer_column_round_trips() {
        let col = Column::new("qty", true, Array::I32(vec![100, 101, 99, 250]))
            .with_compression(CompressionMode::ElementDelta);
        let back = round_trip(&col, 16);
        assert_eq!(back.data, col.data);
        assert!(back.is_index);
    }

    #[test]
    fn rounded_float_column_round_trips_within_tolerance() {
        let col = Column::new("rate", false, Array::F64(vec![1.25, 3.5, -2.75])).with_rounding(2);
        let back = round_trip(&col, 16);
        match back.data {
            Array::F64(v) => {
                for (a, b) in v.iter().zip([1.25, 3.5, -2.75].iter()) {
                    assert!((a - b).abs() < 1e-9);
                }
            }
            other => panic!("expected F64, got {:?}", other),
        }
    }

    #[test]
    fn identifier_too_long_is_rejected() {
        let col = Column::new("much_too_long_identifier", false, Array::U8(vec![1]));
        assert!(encode(&col, 4).is_err());
    }
}
