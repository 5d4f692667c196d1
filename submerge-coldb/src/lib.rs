// coldb: a binary columnar container format for tabular numeric data.
//
// A file is a column-oriented table: a short header, a table of
// column definitions, and a data region holding each column's payload
// bytes back to back. Every column is one of three numeric kinds
// (signed, unsigned, float) at one of a handful of widths, and can
// optionally be delta-compressed against a single reference value,
// float-narrowed losslessly, or rounded to a fixed number of decimal
// places before being stored as the narrowest integer that holds it.
//
//   header.rs (inline, see `container`)    -- 10-byte file header
//   column.rs                              -- per-column definition + payload codec
//   array.rs                               -- typed in-memory arrays + the two delta compressors
//   floatreduce.rs                         -- lossless 64->32->16 bit float narrowing
//   round.rs                               -- fixed-point rounding (half-to-even)
//   width.rs                               -- narrowest-integer-width selection
//   kind.rs                                -- the (kind, width) type registry
//   options.rs                             -- the per-column options bitfield
//   validate.rs                            -- whole-table invariants checked before a write
//   lock.rs                                -- sentinel-file + flock concurrency protocol
//   container.rs                           -- ties the above into `Container::write`/`read`
//
// Everything downstream of `container` trusts that `validate` has already
// run: `column` and `array` assume well-formed, same-length, admissible-width
// input and propagate a typed error rather than panicking when a file turns
// out not to meet that assumption.

mod array;
mod column;
mod container;
mod error;
mod floatreduce;
mod ioutil;
mod kind;
mod lock;
mod options;
mod round;
mod validate;
mod width;

pub use array::{Array, CompressionMode};
pub use column::Column;
pub use container::Container;
pub use error::Kind as ErrorKind;
pub use kind::Kind;
pub use lock::{MAX_READ_BLOCK_WAIT, MAX_WRITE_BLOCK_WAIT};
pub use options::ColumnOptions;
pub use submerge_base::{Error, Result};

#[cfg(test)]
mod test;
