// The container file format (spec.md §4.7 / §6): a 10-byte file header, a
// column-definition table, and a column-data region, written and read under
// the sentinel-file locking protocol in `lock`. Oracle: pandacage.py::PandaCage.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use tracing::{info, warn};

use crate::column::{self, Column};
use crate::error::{coldb_err, Kind as EKind};
use crate::ioutil::{self, FileReader, FileWriter};
use crate::lock;
use crate::validate;
use submerge_base::Result;

const FORMAT_VERSION: u8 = 1;

/// An in-memory table: an ordered set of columns, index columns first. This
/// is the unit `write`/`read` operate on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    columns: Vec<Column>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the column with this identifier. Panics-free:
    /// shape/kind/identifier problems only surface at `write` time, via
    /// `validate`.
    pub fn set_column(&mut self, col: Column) {
        if let Some(existing) = self.columns.iter_mut().find(|c| c.identifier == col.identifier) {
            *existing = col;
        } else {
            self.columns.push(col);
        }
    }

    pub fn get_column(&self, identifier: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.identifier == identifier)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Index columns first, then data columns, each partition in insertion
    /// order (spec.md §4.7).
    fn ordered_columns(&self) -> Vec<&Column> {
        let mut index_cols: Vec<&Column> = self.columns.iter().filter(|c| c.is_index).collect();
        let mut data_cols: Vec<&Column> = self.columns.iter().filter(|c| !c.is_index).collect();
        index_cols.append(&mut data_cols);
        index_cols
    }

    /// Write this container to `path` under an exclusive lock. If `path`
    /// didn't exist before this call, any failure removes the partial file
    /// before the error is returned; an existing file is left untouched on
    /// failure, matching the lifecycle in spec.md §3.3.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let ordered: Vec<Column> = self.ordered_columns().into_iter().cloned().collect();
        validate::validate_columns(&ordered)?;

        // Computed before `acquire_write`, which creates `path` itself (if
        // absent) to have a file descriptor to `flock`.
        let file_is_new = !path.exists();
        let _guard = lock::acquire_write(path)?;
        match self.write_locked(path, &ordered) {
            Ok(()) => {
                info!(path = %path.display(), columns = ordered.len(), "wrote container");
                Ok(())
            }
            Err(e) => {
                if file_is_new {
                    warn!(path = %path.display(), error = %e, "write failed, removing partial file");
                    let _ = fs::remove_file(path);
                }
                Err(e)
            }
        }
    }

    fn write_locked(&self, path: &Path, ordered: &[Column]) -> Result<()> {
        let identifier_width = validate::identifier_width_for(ordered);
        let row_count = ordered.first().map(|c| c.row_count()).unwrap_or(0);

        let mut w = FileWriter::create_or_truncate(path).map_err(submerge_base::Error::from)?;
        write_file_header(&mut w, ordered.len(), row_count, identifier_width)?;

        let encoded: Vec<_> = ordered
            .iter()
            .map(|c| column::encode(c, identifier_width))
            .collect::<Result<Vec<_>>>()?;
        for enc in &encoded {
            column::write_definition(&mut w, enc, identifier_width)?;
        }
        for enc in &encoded {
            column::write_payload(&mut w, enc)?;
        }
        w.flush().map_err(submerge_base::Error::from)?;
        Ok(())
    }

    /// Read a container back from `path` under a shared sentinel-file lock.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let _guard = lock::acquire_read(path)?;

        let mut r = FileReader::open(path).map_err(submerge_base::Error::from)?;
        let (column_count, row_count, identifier_width) = read_file_header(&mut r)?;

        let headers: Vec<_> = (0..column_count)
            .map(|_| column::read_header(&mut r, identifier_width))
            .collect::<Result<Vec<_>>>()?;

        let columns = headers
            .into_iter()
            .map(|h| {
                let is_index = h.options.is_index;
                column::read_payload(&mut r, &h, row_count, is_index)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Container { columns })
    }
}

fn write_file_header(w: &mut FileWriter, column_count: usize, row_count: usize, identifier_width: usize) -> Result<()> {
    if column_count > u16::MAX as usize {
        return Err(coldb_err(
            EKind::ShapeMismatch,
            format!("{} columns exceeds the {}-column file limit", column_count, u16::MAX),
        ));
    }
    if row_count > u32::MAX as usize {
        return Err(coldb_err(
            EKind::ShapeMismatch,
            format!("{} rows exceeds the {}-row file limit", row_count, u32::MAX),
        ));
    }
    if identifier_width > u8::MAX as usize {
        return Err(coldb_err(
            EKind::IdentifierByteRepresentation,
            format!("identifier width {} exceeds the 255-byte file limit", identifier_width),
        ));
    }
    ioutil::write_u8(w, FORMAT_VERSION).map_err(submerge_base::Error::from)?;
    ioutil::write_u16_le(w, 0).map_err(submerge_base::Error::from)?; // global_options: reserved
    ioutil::write_u16_le(w, column_count as u16).map_err(submerge_base::Error::from)?;
    ioutil::write_u32_le(w, row_count as u32).map_err(submerge_base::Error::from)?;
    ioutil::write_u8(w, identifier_width as u8).map_err(submerge_base::Error::from)?;
    Ok(())
}

fn read_file_header(r: &mut FileReader) -> Result<(usize, usize, usize)> {
    let version = ioutil::read_u8(r).map_err(submerge_base::Error::from)?;
    if version != FORMAT_VERSION {
        return Err(coldb_err(
            EKind::ShapeMismatch,
            format!("unsupported container format version {}", version),
        ));
    }
    let _global_options = ioutil::read_u16_le(r).map_err(submerge_base::Error::from)?;
    let column_count = ioutil::read_u16_le(r).map_err(submerge_base::Error::from)? as usize;
    let row_count = ioutil::read_u32_le(r).map_err(submerge_base::Error::from)? as usize;
    let identifier_width = ioutil::read_u8(r).map_err(submerge_base::Error::from)? as usize;
    Ok((column_count, row_count, identifier_width))
}
