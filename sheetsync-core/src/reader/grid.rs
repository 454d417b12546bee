//! In-memory sheet data

use crate::range::{Extent, ResolvedRange};
use chrono::{NaiveDateTime, Timelike};
use serde_json::{Value, json};
use std::collections::HashMap;

/// Cell value types (computed values only, never formulas)
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Date or date-time cell, decoded from the workbook's serial number
    DateTime(NaiveDateTime),
    Error(String),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text form used when a cell is read as a task-table field.
    /// Blank text counts as missing.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            CellValue::Empty => return None,
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Boolean(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            CellValue::DateTime(dt) => format_datetime(dt),
            CellValue::Error(e) => e.clone(),
        };
        (!text.is_empty()).then_some(text)
    }

    /// JSON value sent to the Sheets API. Empty cells become `""` so the
    /// destination grid keeps its shape; dates go out as text the API parses
    /// back into dates under `USER_ENTERED` input.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Empty => json!(""),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    json!(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or_else(|| json!(n.to_string()))
                }
            }
            CellValue::Text(s) => json!(s),
            CellValue::Boolean(b) => json!(b),
            CellValue::DateTime(dt) => json!(format_datetime(dt)),
            CellValue::Error(e) => json!(e),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// `2024-01-15` for midnight values, `2024-01-15 08:30:00` otherwise
fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// A loaded worksheet, addressed by absolute zero-based sheet positions
#[derive(Debug, Clone, Default)]
pub struct Grid {
    pub name: String,
    pub cells: HashMap<(u32, u32), CellValue>,
    extent: Extent,
}

impl Grid {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build a grid from rows of values starting at A1
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut grid = Self::new(name);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                grid.set(r as u32, c as u32, value);
            }
        }
        grid
    }

    /// Store a value. Empty values still widen the extent, matching how
    /// spreadsheet apps report a used range.
    pub fn set(&mut self, row: u32, col: u32, value: CellValue) {
        self.extent.rows = self.extent.rows.max(row + 1);
        self.extent.columns = self.extent.columns.max(col + 1);
        if !value.is_empty() {
            self.cells.insert((row, col), value);
        }
    }

    /// Get a cell at the given position
    pub fn get(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Rows and columns from A1 to the last used cell
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Copy a window out of the grid, padding missing cells with `Empty`
    pub fn extract(&self, window: &ResolvedRange) -> ValueGrid {
        let rows = (window.start_row..=window.end_row)
            .map(|row| {
                (window.start_col..=window.end_col)
                    .map(|col| self.get(row, col).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        ValueGrid { rows }
    }
}

/// Dense rectangular block of values, row-major
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueGrid {
    rows: Vec<Vec<CellValue>>,
}

impl ValueGrid {
    /// Build from rows, padding short rows with `Empty` to a common width
    pub fn from_rows(mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, CellValue::Empty);
        }
        Self { rows }
    }

    pub fn height(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn width(&self) -> u32 {
        self.rows.first().map_or(0, |r| r.len() as u32)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn to_json(&self) -> Value {
        Value::Array(
            self.rows
                .iter()
                .map(|row| Value::Array(row.iter().map(CellValue::to_json).collect()))
                .collect(),
        )
    }
}
