//! Runs transfer records one at a time, in order

use crate::config::ExecutorSettings;
use crate::error::{RangeError, RemoteError, TransferError};
use crate::range::ResolvedRange;
use crate::reader::LocalSheetReader;
use crate::remote::RemoteSpreadsheetClient;
use crate::task::{TabMode, TaskRecord};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Result of one record
#[derive(Debug)]
pub enum TransferStatus {
    Copied {
        cells_written: u64,
        /// Destination window that received the values
        window: ResolvedRange,
    },
    Failed(TransferError),
}

/// Outcome of one record, in task-table order
#[derive(Debug)]
pub struct TransferOutcome {
    pub row_number: u32,
    pub source_file: String,
    pub spreadsheet_id: String,
    pub tab: String,
    pub status: TransferStatus,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TransferStatus::Copied { .. })
    }
}

/// Executes records against a source folder
pub struct Executor {
    folder: PathBuf,
    settings: ExecutorSettings,
}

impl Executor {
    pub fn new(folder: impl Into<PathBuf>, settings: ExecutorSettings) -> Self {
        Self {
            folder: folder.into(),
            settings,
        }
    }

    /// Run every record. A failing record is reported and the batch goes on.
    pub fn execute(
        &self,
        records: &[TaskRecord],
        reader: &dyn LocalSheetReader,
        remote: &dyn RemoteSpreadsheetClient,
    ) -> Vec<TransferOutcome> {
        records
            .iter()
            .map(|record| {
                let status = match self.run_record(record, reader, remote) {
                    Ok((cells_written, window)) => {
                        info!(
                            "Row {}: copied {} cell(s) from '{}' to {}!{}",
                            record.row_number,
                            cells_written,
                            record.source_file,
                            record.tab_mode.target_tab(),
                            window
                        );
                        TransferStatus::Copied {
                            cells_written,
                            window,
                        }
                    }
                    Err(err) => {
                        warn!(
                            "Row {}: failed to process '{}': {}",
                            record.row_number, record.source_file, err
                        );
                        TransferStatus::Failed(err)
                    }
                };
                TransferOutcome {
                    row_number: record.row_number,
                    source_file: record.source_file.clone(),
                    spreadsheet_id: record.spreadsheet_id.clone(),
                    tab: record.tab_mode.target_tab().to_string(),
                    status,
                }
            })
            .collect()
    }

    fn run_record(
        &self,
        record: &TaskRecord,
        reader: &dyn LocalSheetReader,
        remote: &dyn RemoteSpreadsheetClient,
    ) -> Result<(u64, ResolvedRange), TransferError> {
        let grid = reader.load(&self.folder.join(&record.source_file))?;
        let source_window = record.source_range.resolve(grid.extent())?;
        // Explicit end cells are not bounded by the data; cap before padding
        if source_window.cell_count() > self.settings.max_cells {
            return Err(RangeError::TooLarge {
                range: source_window.to_a1(),
                cells: source_window.cell_count(),
                limit: self.settings.max_cells,
            }
            .into());
        }

        // Checked before any tab is deleted or duplicated
        let (rows, columns) = (source_window.rows(), source_window.columns());
        let window = ResolvedRange::anchored_at(record.dest_start, rows, columns)
            .ok_or_else(|| RangeError::OutOfBounds {
                anchor: record.dest_start.to_notation(),
                rows,
                columns,
            })?;

        let values = grid.extract(&source_window);
        debug!(
            "Row {}: extracted {} from '{}' ({} rows x {} columns)",
            record.row_number,
            source_window,
            record.source_file,
            values.height(),
            values.width()
        );

        let tab = self.prepare_tab(record, remote)?;
        let cells_written =
            remote.write_range(&record.spreadsheet_id, &tab, record.dest_start, &values)?;
        Ok((cells_written, window))
    }

    /// Make sure the destination tab exists and return its name
    fn prepare_tab(
        &self,
        record: &TaskRecord,
        remote: &dyn RemoteSpreadsheetClient,
    ) -> Result<String, RemoteError> {
        let id = &record.spreadsheet_id;
        match &record.tab_mode {
            TabMode::Named(tab) => {
                if !self.settings.skip_tab_check && !remote.list_tabs(id)?.contains(tab) {
                    return Err(RemoteError::NotFound(format!(
                        "tab '{tab}' in spreadsheet {id}"
                    )));
                }
                Ok(tab.clone())
            }
            TabMode::CreateFromTemplate { template, new_name } => {
                let tabs = remote.list_tabs(id)?;
                if !tabs.contains(template) {
                    return Err(RemoteError::NotFound(format!(
                        "template tab '{template}' in spreadsheet {id}"
                    )));
                }
                // Replace the previous run's copy so repeated runs stay idempotent
                if tabs.contains(new_name) {
                    debug!("Deleting existing tab '{}' in {}", new_name, id);
                    remote.delete_tab(id, new_name)?;
                }
                remote.duplicate_tab(id, template, new_name)
            }
        }
    }
}
