//! Error taxonomy for table loading and per-record transfers

use std::path::PathBuf;
use thiserror::Error;

/// Malformed cell notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellRefError {
    #[error("invalid cell reference '{0}'")]
    InvalidReference(String),
    #[error("cell reference '{notation}' lies above the first {offset} row(s) of the data")]
    AboveOrigin { notation: String, offset: u32 },
}

/// A window that cannot be copied: inverted, too large, or past the sheet bounds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("empty range: rows {start_row}..={end_row}, columns {start_col}..={end_col}")]
    EmptyRange {
        start_row: i64,
        start_col: i64,
        end_row: i64,
        end_col: i64,
    },
    #[error("a {rows}x{columns} window anchored at {anchor} runs past the sheet bounds")]
    OutOfBounds {
        anchor: String,
        rows: u32,
        columns: u32,
    },
    #[error("range {range} spans {cells} cells, more than the limit of {limit}")]
    TooLarge { range: String, cells: u64, limit: u64 },
}

/// Errors that abort the whole batch before any record runs
#[derive(Debug, Error)]
pub enum TaskTableError {
    #[error("task file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read task file {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },
    #[error("task file {} has no header row at row {row}", path.display())]
    MissingHeaderRow { path: PathBuf, row: u32 },
    #[error("task file is missing required column '{0}'")]
    MissingColumn(String),
}

/// Source workbook could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceFileError {
    #[error("source file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("source file {} is unreadable: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },
    #[error("source file {} has no worksheet", .0.display())]
    NoWorksheet(PathBuf),
}

/// Failures reported by a remote spreadsheet client
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("remote API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Any failure that ends a single record. Caught at the executor's
/// per-record boundary.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    InvalidReference(#[from] CellRefError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    SourceFile(#[from] SourceFileError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl TransferError {
    /// Short machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::InvalidReference(_) => "invalid_reference",
            TransferError::Range(RangeError::EmptyRange { .. }) => "empty_range",
            TransferError::Range(RangeError::OutOfBounds { .. }) => "out_of_bounds",
            TransferError::Range(RangeError::TooLarge { .. }) => "range_too_large",
            TransferError::SourceFile(_) => "source_file",
            TransferError::Remote(_) => "remote",
        }
    }
}

/// Batch-level failures from a [`crate::Session`]
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("a batch is already running for {}", .0.display())]
    AlreadyRunning(PathBuf),
    #[error(transparent)]
    TaskTable(#[from] TaskTableError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_kind() {
        let too_large = TransferError::from(RangeError::TooLarge {
            range: "A1:ZZ9999999".to_string(),
            cells: 7_019_999_298,
            limit: 10_000_000,
        });
        assert_eq!(too_large.kind(), "range_too_large");
        assert_eq!(
            too_large.to_string(),
            "range A1:ZZ9999999 spans 7019999298 cells, more than the limit of 10000000"
        );

        let empty = TransferError::from(RangeError::EmptyRange {
            start_row: 1,
            start_col: 0,
            end_row: 0,
            end_col: 0,
        });
        assert_eq!(empty.kind(), "empty_range");

        let remote = TransferError::from(RemoteError::NotFound("x".to_string()));
        assert_eq!(remote.kind(), "remote");
    }
}
