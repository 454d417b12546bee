//! Turns task-table rows into an ordered queue of transfer records

use crate::cell::CellAddress;
use crate::config::PlannerSettings;
use crate::error::CellRefError;
use crate::range::RangeSpec;
use crate::task::{TabMode, TaskRecord, TaskRow, TaskTable};
use log::{debug, warn};
use thiserror::Error;

/// Why a task row did not become a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    InvalidReference(#[from] CellRefError),
}

/// A task row that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub row_number: u32,
    pub source_file: Option<String>,
    pub reason: RowRejection,
}

/// Records in task-table order plus the rows that were skipped
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub records: Vec<TaskRecord>,
    pub rejected: Vec<RejectedRow>,
}

impl Plan {
    pub fn skipped_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Validate every non-blank row of the table. Never fails as a whole.
pub fn plan(table: &TaskTable, settings: &PlannerSettings) -> Plan {
    let mut plan = Plan::default();

    for row in table.rows.iter().filter(|r| !r.is_blank()) {
        match plan_row(row, settings) {
            Ok(record) => {
                debug!(
                    "Row {}: {} -> {}/{}",
                    record.row_number,
                    record.source_file,
                    record.spreadsheet_id,
                    record.tab_mode.target_tab()
                );
                plan.records.push(record);
            }
            Err(reason) => {
                warn!("Skipping task row {}: {}", row.row_number, reason);
                plan.rejected.push(RejectedRow {
                    row_number: row.row_number,
                    source_file: row.source_file.clone(),
                    reason,
                });
            }
        }
    }

    plan
}

fn plan_row(row: &TaskRow, settings: &PlannerSettings) -> Result<TaskRecord, RowRejection> {
    let required = |value: &Option<String>, field: &'static str| {
        value.clone().ok_or(RowRejection::MissingField(field))
    };

    let source_file = required(&row.source_file, "source file")?;
    let source_start = required(&row.source_start, "source start cell")?;
    let source_end = required(&row.source_end, "source end cell")?;
    let spreadsheet_id = required(&row.spreadsheet_id, "destination spreadsheet id")?;
    let tab = required(&row.tab, "destination tab")?;
    let dest_start = required(&row.dest_start, "destination start cell")?;

    let tab_mode = if tab.trim().eq_ignore_ascii_case(settings.create_sentinel.trim()) {
        let template = required(&row.template_tab, "template tab")?;
        TabMode::CreateFromTemplate {
            new_name: format!("{}{}", settings.copy_prefix, template),
            template,
        }
    } else {
        TabMode::Named(tab)
    };

    Ok(TaskRecord {
        row_number: row.row_number,
        // The row offset shifts source cells only
        source_range: RangeSpec::parse(&source_start, &source_end, settings.source_row_offset)?,
        dest_start: CellAddress::parse(&dest_start)?,
        source_file,
        spreadsheet_id,
        tab_mode,
    })
}
