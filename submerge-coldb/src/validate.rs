// Container-level validation (spec.md §3 invariants / §8): every column
// must share one row count, use an admissible kind/width, and carry a
// unique, representable identifier. Oracle: pandacage.py::_validate_data_for_write.

use std::collections::HashSet;

use crate::column::Column;
use crate::error::{coldb_err, Kind as EKind};
use submerge_base::Result;

/// Validate a full set of columns (index columns followed by data columns,
/// in the order they'll be written) before encoding any of them.
pub fn validate_columns(columns: &[Column]) -> Result<()> {
    let mut row_count = None;
    let mut seen_identifiers = HashSet::new();

    for col in columns {
        match row_count {
            None => row_count = Some(col.row_count()),
            Some(expected) if expected != col.row_count() => {
                return Err(coldb_err(
                    EKind::ShapeMismatch,
                    format!(
                        "column {:?} has {} rows, expected {} (from an earlier column)",
                        col.identifier,
                        col.row_count(),
                        expected
                    ),
                ));
            }
            Some(_) => {}
        }

        col.data.kind().validate_bits(col.data.bits())?;

        if col.identifier.is_empty() {
            return Err(coldb_err(
                EKind::IdentifierByteRepresentation,
                "column identifier must not be empty",
            ));
        }
        if !col.identifier.is_ascii() {
            return Err(coldb_err(
                EKind::IdentifierByteRepresentation,
                format!("identifier {:?} is not representable as ASCII", col.identifier),
            ));
        }
        if !seen_identifiers.insert(col.identifier.clone()) {
            return Err(coldb_err(
                EKind::DuplicateIdentifier,
                format!("identifier {:?} is used by more than one column", col.identifier),
            ));
        }
    }
    Ok(())
}

/// The container's identifier width (spec.md §4.7 / Open Question 4): four
/// bytes per character, sized to the longest identifier across every column
/// (index columns and data columns alike).
pub fn identifier_width_for(columns: &[Column]) -> usize {
    columns.iter().map(|c| c.identifier.len()).max().unwrap_or(0) * 4
}
