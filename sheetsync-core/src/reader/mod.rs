//! Spreadsheet file reader using calamine

use crate::error::SourceFileError;
use calamine::{Data, Range, Reader, open_workbook_auto};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub mod grid;

pub use grid::{CellValue, Grid, ValueGrid};

/// Loads the first worksheet of a spreadsheet file as computed values
pub trait LocalSheetReader {
    fn load(&self, path: &Path) -> Result<Grid, SourceFileError>;
}

/// Reads `.xlsx`, `.xlsm`, `.xls`, `.xlsb` and `.ods` through calamine
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineReader;

impl LocalSheetReader for CalamineReader {
    fn load(&self, path: &Path) -> Result<Grid, SourceFileError> {
        read_first_sheet(path)
    }
}

/// Read the first sheet of a workbook, values only
pub fn read_first_sheet<P: AsRef<Path>>(path: P) -> Result<Grid, SourceFileError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(SourceFileError::NotFound(path.to_path_buf()));
    }

    let unreadable = |e: calamine::Error| SourceFileError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut excel = open_workbook_auto(path).map_err(unreadable)?;
    let name = excel
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SourceFileError::NoWorksheet(path.to_path_buf()))?;
    let range = excel
        .worksheet_range_at(0)
        .ok_or_else(|| SourceFileError::NoWorksheet(path.to_path_buf()))?
        .map_err(unreadable)?;

    Ok(grid_from_range(&name, &range))
}

fn grid_from_range(name: &str, range: &Range<Data>) -> Grid {
    let mut grid = Grid::new(name);
    // Relative positions inside the range are shifted by its absolute start
    let (row_start, col_start) = range.start().unwrap_or((0, 0));
    for (rel_row, rel_col, data) in range.cells() {
        grid.set(
            row_start + rel_row as u32,
            col_start + rel_col as u32,
            parse_cell_value(data),
        );
    }
    grid
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
        // Durations keep their numeric day count
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Reader serving pre-built grids, keyed by path. Unknown paths fail with
/// `NotFound`; the load count per path is kept for assertions.
#[derive(Debug, Default)]
pub struct MemoryReader {
    grids: HashMap<PathBuf, Grid>,
    loads: Mutex<Vec<PathBuf>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, path: impl Into<PathBuf>, grid: Grid) -> Self {
        self.grids.insert(path.into(), grid);
        self
    }

    /// Paths passed to `load`, in call order
    pub fn loads(&self) -> Vec<PathBuf> {
        self.loads.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl LocalSheetReader for MemoryReader {
    fn load(&self, path: &Path) -> Result<Grid, SourceFileError> {
        if let Ok(mut loads) = self.loads.lock() {
            loads.push(path.to_path_buf());
        }
        self.grids
            .get(path)
            .cloned()
            .ok_or_else(|| SourceFileError::NotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let err = read_first_sheet("/definitely/not/here.xlsx").unwrap_err();
        assert_eq!(
            err,
            SourceFileError::NotFound(PathBuf::from("/definitely/not/here.xlsx"))
        );
    }

    #[test]
    fn test_range_offset_is_absolute() {
        let mut range = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("x".to_string()));
        range.set_value((3, 2), Data::Float(1.5));
        let grid = grid_from_range("Sheet1", &range);
        assert_eq!(grid.get(2, 1), Some(&CellValue::Text("x".to_string())));
        assert_eq!(grid.get(3, 2), Some(&CellValue::Number(1.5)));
        assert_eq!(grid.extent(), crate::range::Extent::new(4, 3));
    }

    #[test]
    fn test_memory_reader() {
        let reader = MemoryReader::new().with_grid("a.xlsx", Grid::new("Sheet1"));
        assert!(reader.load(Path::new("a.xlsx")).is_ok());
        assert!(matches!(
            reader.load(Path::new("b.xlsx")),
            Err(SourceFileError::NotFound(_))
        ));
        assert_eq!(reader.loads().len(), 2);
    }
}
