//! Task table loading and the normalized transfer record

use crate::cell::CellAddress;
use crate::config::{ColumnNames, TaskTableConfig};
use crate::error::{SourceFileError, TaskTableError};
use crate::range::RangeSpec;
use crate::reader::{Grid, LocalSheetReader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One row of the task table as read, before validation.
/// Blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRow {
    /// 1-based sheet row the values came from
    pub row_number: u32,
    pub source_file: Option<String>,
    pub source_start: Option<String>,
    pub source_end: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub tab: Option<String>,
    pub template_tab: Option<String>,
    pub dest_start: Option<String>,
}

impl TaskRow {
    pub fn is_blank(&self) -> bool {
        self.source_file.is_none()
            && self.source_start.is_none()
            && self.source_end.is_none()
            && self.spreadsheet_id.is_none()
            && self.tab.is_none()
            && self.template_tab.is_none()
            && self.dest_start.is_none()
    }
}

/// Rows of a task table whose header matched every required column
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    pub path: PathBuf,
    pub rows: Vec<TaskRow>,
}

impl TaskTable {
    /// Load and validate a task table file
    pub fn load(
        reader: &dyn LocalSheetReader,
        path: &Path,
        config: &TaskTableConfig,
    ) -> Result<Self, TaskTableError> {
        let grid = reader.load(path).map_err(|e| match e {
            SourceFileError::NotFound(p) => TaskTableError::NotFound(p),
            other => TaskTableError::Unreadable {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        })?;
        Self::from_grid(path, &grid, config)
    }

    /// Build from a loaded grid. `config.header_row` is the 1-based row holding
    /// the headers; data starts on the row below.
    pub fn from_grid(
        path: &Path,
        grid: &Grid,
        config: &TaskTableConfig,
    ) -> Result<Self, TaskTableError> {
        let header_index = config.header_row.saturating_sub(1);
        let extent = grid.extent();
        if header_index >= extent.rows {
            return Err(TaskTableError::MissingHeaderRow {
                path: path.to_path_buf(),
                row: config.header_row,
            });
        }

        let columns = ColumnMap::resolve(grid, header_index, &config.columns)?;
        let text = |row: u32, col: u32| grid.get(row, col).and_then(|v| v.as_text());

        let rows = (header_index + 1..extent.rows)
            .map(|row| TaskRow {
                row_number: row + 1,
                source_file: text(row, columns.source_file),
                source_start: text(row, columns.source_start),
                source_end: text(row, columns.source_end),
                spreadsheet_id: text(row, columns.spreadsheet_id),
                tab: text(row, columns.tab),
                template_tab: text(row, columns.template_tab),
                dest_start: text(row, columns.dest_start),
            })
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }
}

/// Zero-based column index of each required header
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    source_file: u32,
    source_start: u32,
    source_end: u32,
    spreadsheet_id: u32,
    tab: u32,
    template_tab: u32,
    dest_start: u32,
}

impl ColumnMap {
    fn resolve(grid: &Grid, header_row: u32, names: &ColumnNames) -> Result<Self, TaskTableError> {
        let headers: HashMap<String, u32> = (0..grid.extent().columns)
            .rev()
            .filter_map(|col| {
                let header = grid.get(header_row, col)?.as_text()?;
                Some((header, col))
            })
            .collect();

        // Iterating right-to-left above keeps the leftmost column for duplicate headers
        let find = |header: &str| {
            headers
                .get(header.trim())
                .copied()
                .ok_or_else(|| TaskTableError::MissingColumn(header.to_string()))
        };

        Ok(Self {
            source_file: find(&names.source_file)?,
            source_start: find(&names.source_start)?,
            source_end: find(&names.source_end)?,
            spreadsheet_id: find(&names.spreadsheet_id)?,
            tab: find(&names.tab)?,
            template_tab: find(&names.template_tab)?,
            dest_start: find(&names.dest_start)?,
        })
    }
}

/// How the destination tab is obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabMode {
    /// Write into an existing tab
    Named(String),
    /// Duplicate `template` as `new_name`, replacing any tab already called that
    CreateFromTemplate { template: String, new_name: String },
}

impl TabMode {
    /// Tab the values end up in
    pub fn target_tab(&self) -> &str {
        match self {
            TabMode::Named(name) => name,
            TabMode::CreateFromTemplate { new_name, .. } => new_name,
        }
    }
}

/// A validated transfer instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// 1-based task-table row the record came from
    pub row_number: u32,
    pub source_file: String,
    pub source_range: RangeSpec,
    pub spreadsheet_id: String,
    pub tab_mode: TabMode,
    pub dest_start: CellAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CellValue;

    fn t(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn header() -> Vec<CellValue> {
        [
            "Source Excell Spreadsheet",
            "Starting CELL",
            "Ending CELL * means all",
            "Google Sheet ID",
            "Tab",
            "Duplicate Tab",
            "Starting Cell",
        ]
        .into_iter()
        .map(t)
        .collect()
    }

    #[test]
    fn test_reads_rows_below_header() {
        let grid = Grid::from_rows(
            "Tasks",
            vec![
                vec![t("Monthly push")],
                header(),
                vec![
                    t("sales.xlsx"),
                    t("A2"),
                    t("*"),
                    t("abc123"),
                    t("Data"),
                    CellValue::Empty,
                    t("B3"),
                ],
                vec![],
                vec![t("stock.xlsx"), t("A1")],
            ],
        );
        let table =
            TaskTable::from_grid(Path::new("Task File.xlsx"), &grid, &TaskTableConfig::default())
                .unwrap();

        assert_eq!(table.rows.len(), 3);
        let first = &table.rows[0];
        assert_eq!(first.row_number, 3);
        assert_eq!(first.source_file.as_deref(), Some("sales.xlsx"));
        assert_eq!(first.source_end.as_deref(), Some("*"));
        assert_eq!(first.template_tab, None);
        assert_eq!(first.dest_start.as_deref(), Some("B3"));
        assert!(table.rows[1].is_blank());
        assert_eq!(table.rows[2].row_number, 5);
        assert_eq!(table.rows[2].spreadsheet_id, None);
    }

    #[test]
    fn test_column_order_is_free() {
        let mut cols = header();
        cols.reverse();
        let mut row: Vec<CellValue> = ["s.xlsx", "A1", "C3", "id", "Tab1", "", "A1"]
            .into_iter()
            .map(t)
            .collect();
        row.reverse();
        let grid = Grid::from_rows("Tasks", vec![cols, row]);
        let config = TaskTableConfig {
            header_row: 1,
            ..Default::default()
        };
        let table = TaskTable::from_grid(Path::new("t.xlsx"), &grid, &config).unwrap();
        assert_eq!(table.rows[0].source_file.as_deref(), Some("s.xlsx"));
        assert_eq!(table.rows[0].source_end.as_deref(), Some("C3"));
        assert_eq!(table.rows[0].tab.as_deref(), Some("Tab1"));
    }

    #[test]
    fn test_missing_column_fails_whole_table() {
        let mut cols = header();
        cols.remove(3);
        let grid = Grid::from_rows("Tasks", vec![vec![], cols]);
        let err = TaskTable::from_grid(Path::new("t.xlsx"), &grid, &TaskTableConfig::default())
            .unwrap_err();
        assert!(matches!(err, TaskTableError::MissingColumn(c) if c == "Google Sheet ID"));
    }

    #[test]
    fn test_header_row_beyond_data() {
        let grid = Grid::from_rows("Tasks", vec![header()]);
        let err = TaskTable::from_grid(Path::new("t.xlsx"), &grid, &TaskTableConfig::default())
            .unwrap_err();
        assert!(matches!(err, TaskTableError::MissingHeaderRow { row: 2, .. }));
    }

    #[test]
    fn test_target_tab() {
        let named = TabMode::Named("Data".to_string());
        assert_eq!(named.target_tab(), "Data");
        let created = TabMode::CreateFromTemplate {
            template: "Template".to_string(),
            new_name: "Copy of Template".to_string(),
        };
        assert_eq!(created.target_tab(), "Copy of Template");
    }
}
