//! Cell notation ("B12") <-> zero-based (row, col) addresses

use crate::error::CellRefError;
use regex::Regex;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::LazyLock;

static NOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("valid cell notation regex"));

/// Zero-based cell address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse notation such as "B12" (case-insensitive) into a zero-based address
    pub fn parse(notation: &str) -> Result<Self, CellRefError> {
        Self::parse_with_row_offset(notation, 0)
    }

    /// Parse notation against a grid that omits the first `row_offset` sheet rows.
    ///
    /// With `row_offset = 2`, "A3" maps to row 0. Anything above the grid's
    /// first row is rejected rather than wrapped.
    pub fn parse_with_row_offset(notation: &str, row_offset: u32) -> Result<Self, CellRefError> {
        let trimmed = notation.trim();
        let invalid = || CellRefError::InvalidReference(notation.to_string());

        let caps = NOTATION.captures(trimmed).ok_or_else(invalid)?;
        let col = column_number(&caps[1]).ok_or_else(invalid)?;
        let row: u32 = caps[2].parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }

        let row = (row - 1)
            .checked_sub(row_offset)
            .ok_or_else(|| CellRefError::AboveOrigin {
                notation: notation.to_string(),
                offset: row_offset,
            })?;

        Ok(Self { row, col: col - 1 })
    }

    /// Convert to spreadsheet notation (e.g., "A1")
    pub fn to_notation(&self) -> String {
        format!("{}{}", column_letters(self.col), self.row as u64 + 1)
    }
}

/// 1-based column number of a letter code (A=1, Z=26, AA=27).
/// Returns `None` for empty input, non-letters, or overflow.
pub fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, ch| {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// Letter code for a zero-based column index (0 -> A, 26 -> AA)
pub fn column_letters(col: u32) -> String {
    let mut col = col as u64;
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

impl FromStr for CellAddress {
    type Err = CellRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialOrd for CellAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row.cmp(&other.row).then_with(|| self.col.cmp(&other.col))
    }
}

impl std::fmt::Display for CellAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_notation())
    }
}
