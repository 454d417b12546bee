//! Range specifications and their resolution against loaded data

use crate::cell::{CellAddress, column_letters};
use crate::error::{CellRefError, RangeError};

/// Literal that means "to the data's extent" in the task table
pub const TO_EXTENT: &str = "*";

/// End of a declared range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    Cell(CellAddress),
    /// Extend to the last used row and column of the loaded sheet
    ToExtent,
}

/// Declared source window, possibly open-ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: CellAddress,
    pub end: RangeEnd,
}

/// Number of used rows and columns of a loaded sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extent {
    pub rows: u32,
    pub columns: u32,
}

impl Extent {
    pub fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }
}

/// Concrete, inclusive, zero-based window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl RangeSpec {
    pub fn new(start: CellAddress, end: RangeEnd) -> Self {
        Self { start, end }
    }

    /// Parse the start and end cells of a task row. `row_offset` is forwarded
    /// to [`CellAddress::parse_with_row_offset`] for both cells.
    pub fn parse(start: &str, end: &str, row_offset: u32) -> Result<Self, CellRefError> {
        let start = CellAddress::parse_with_row_offset(start, row_offset)?;
        let end = if end.trim() == TO_EXTENT {
            RangeEnd::ToExtent
        } else {
            RangeEnd::Cell(CellAddress::parse_with_row_offset(end, row_offset)?)
        };
        Ok(Self { start, end })
    }

    /// Resolve against the extent of the loaded data
    pub fn resolve(&self, extent: Extent) -> Result<ResolvedRange, RangeError> {
        let (end_row, end_col) = match self.end {
            RangeEnd::Cell(addr) => (addr.row as i64, addr.col as i64),
            RangeEnd::ToExtent => (extent.rows as i64 - 1, extent.columns as i64 - 1),
        };
        let (start_row, start_col) = (self.start.row as i64, self.start.col as i64);

        if end_row < start_row || end_col < start_col {
            return Err(RangeError::EmptyRange {
                start_row,
                start_col,
                end_row,
                end_col,
            });
        }

        Ok(ResolvedRange {
            start_row: self.start.row,
            start_col: self.start.col,
            end_row: end_row as u32,
            end_col: end_col as u32,
        })
    }
}

impl ResolvedRange {
    /// Window of `rows` x `columns` cells whose top-left corner is `top_left`.
    /// Both dimensions must be non-zero.
    pub fn anchored_at(top_left: CellAddress, rows: u32, columns: u32) -> Option<Self> {
        if rows == 0 || columns == 0 {
            return None;
        }
        Some(Self {
            start_row: top_left.row,
            start_col: top_left.col,
            end_row: top_left.row.checked_add(rows - 1)?,
            end_col: top_left.col.checked_add(columns - 1)?,
        })
    }

    pub fn rows(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn columns(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    pub fn cell_count(&self) -> u64 {
        self.rows() as u64 * self.columns() as u64
    }

    /// A1 rendering, e.g. "B2:D5"
    pub fn to_a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letters(self.start_col),
            self.start_row as u64 + 1,
            column_letters(self.end_col),
            self.end_row as u64 + 1
        )
    }
}

impl std::fmt::Display for ResolvedRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}
