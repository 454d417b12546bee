//! sheetsync-core: copy spreadsheet ranges into Google Sheets tabs
//!
//! A task table lists, one row per transfer, a local source file and range and
//! a destination spreadsheet, tab and start cell. [`Session`] loads that table,
//! plans it into [`TaskRecord`]s and runs them in order, reporting one
//! [`TransferOutcome`] per record.

pub mod cell;
pub mod config;
pub mod error;
pub mod executor;
pub mod planner;
pub mod range;
pub mod reader;
pub mod remote;
pub mod state;
pub mod task;

use log::info;
use std::path::{Path, PathBuf};

pub use cell::CellAddress;
pub use config::SyncConfig;
pub use error::{BatchError, TaskTableError, TransferError};
pub use executor::{Executor, TransferOutcome, TransferStatus};
pub use planner::{Plan, RejectedRow};
pub use range::{Extent, RangeEnd, RangeSpec, ResolvedRange};
pub use reader::{CalamineReader, LocalSheetReader};
pub use remote::{MemoryClient, RemoteSpreadsheetClient};
pub use state::{Credentials, FolderCache, RunGuard, RunToken};
pub use task::{TabMode, TaskRecord, TaskTable};

/// Everything one batch run produced
#[derive(Debug, Default)]
pub struct BatchReport {
    pub task_file: PathBuf,
    pub rejected: Vec<RejectedRow>,
    pub outcomes: Vec<TransferOutcome>,
}

impl BatchReport {
    pub fn copied_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.copied_count()
    }

    pub fn skipped_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Configuration plus the resolved source folder. The run guard is keyed by
/// folder, so at most one batch runs per folder in this process at a time.
#[derive(Debug, Clone)]
pub struct Session {
    config: SyncConfig,
    folder: PathBuf,
    guard: RunGuard,
}

impl Session {
    pub fn new(config: SyncConfig, folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        Self {
            config,
            guard: RunGuard::for_folder(&folder),
            folder,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn task_file(&self) -> PathBuf {
        self.folder.join(&self.config.task_table.file_name)
    }

    /// Load the task table; any error here aborts the batch
    pub fn load_table(&self, reader: &dyn LocalSheetReader) -> Result<TaskTable, TaskTableError> {
        TaskTable::load(reader, &self.task_file(), &self.config.task_table)
    }

    pub fn plan(&self, table: &TaskTable) -> Plan {
        planner::plan(table, &self.config.planner)
    }

    /// Load, plan and execute. Only table-level problems (or a concurrent run)
    /// produce `Err`; per-record failures are in the report.
    pub fn run(
        &self,
        reader: &dyn LocalSheetReader,
        remote: &dyn RemoteSpreadsheetClient,
    ) -> Result<BatchReport, BatchError> {
        let _token = self.acquire()?;
        let table = self.load_table(reader)?;
        let plan = self.plan(&table);
        Ok(self.execute(table.path, plan, reader, remote))
    }

    /// Execute an already built plan under the run guard
    pub fn run_plan(
        &self,
        task_file: PathBuf,
        plan: Plan,
        reader: &dyn LocalSheetReader,
        remote: &dyn RemoteSpreadsheetClient,
    ) -> Result<BatchReport, BatchError> {
        let _token = self.acquire()?;
        Ok(self.execute(task_file, plan, reader, remote))
    }

    fn acquire(&self) -> Result<RunToken, BatchError> {
        self.guard
            .try_acquire()
            .ok_or_else(|| BatchError::AlreadyRunning(self.folder.clone()))
    }

    fn execute(
        &self,
        task_file: PathBuf,
        plan: Plan,
        reader: &dyn LocalSheetReader,
        remote: &dyn RemoteSpreadsheetClient,
    ) -> BatchReport {
        info!(
            "Running {} record(s) from {} ({} row(s) skipped)",
            plan.records.len(),
            task_file.display(),
            plan.skipped_count()
        );
        let executor = Executor::new(&self.folder, self.config.executor.clone());
        let outcomes = executor.execute(&plan.records, reader, remote);

        BatchReport {
            task_file,
            rejected: plan.rejected,
            outcomes,
        }
    }
}

/// In-memory client holding every spreadsheet and tab a plan refers to, for
/// rehearsing a batch without touching the remote service
pub fn rehearsal_client(plan: &Plan) -> MemoryClient {
    let client = MemoryClient::new();
    for record in &plan.records {
        let tab = match &record.tab_mode {
            TabMode::Named(tab) => tab,
            TabMode::CreateFromTemplate { template, .. } => template,
        };
        client.add_spreadsheet(&record.spreadsheet_id, &[tab.as_str()]);
    }
    client
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{CellValue, Grid, MemoryReader};

    fn t(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn task_grid() -> Grid {
        let header = [
            "Source Excell Spreadsheet",
            "Starting CELL",
            "Ending CELL * means all",
            "Google Sheet ID",
            "Tab",
            "Duplicate Tab",
            "Starting Cell",
        ];
        let rows = [
            ["a.xlsx", "A1", "*", "sheet-1", "Data", "", "A1"],
            ["b.xlsx", "A1", "*", "", "Data", "", "A1"],
            ["a.xlsx", "A1", "B1", "sheet-1", "Create New", "Template", "C3"],
        ];
        let mut grid_rows = vec![vec![t("Tasks")], header.map(t).to_vec()];
        grid_rows.extend(rows.iter().map(|r| r.map(t).to_vec()));
        Grid::from_rows("Tasks", grid_rows)
    }

    // Each test uses its own folder since run guards are shared per folder
    fn reader(folder: &str) -> MemoryReader {
        MemoryReader::new()
            .with_grid(format!("{folder}/Task File.xlsx"), task_grid())
            .with_grid(
                format!("{folder}/a.xlsx"),
                Grid::from_rows("S", vec![vec![t("x"), t("y")], vec![t("z")]]),
            )
    }

    #[test]
    fn test_run_reports_outcomes_and_skips() {
        let folder = "/work/outcomes";
        let session = Session::new(SyncConfig::default(), folder);
        let remote = MemoryClient::new().with_spreadsheet("sheet-1", &["Data", "Template"]);

        let report = session.run(&reader(folder), &remote).unwrap();

        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.rejected[0].row_number, 4);
        assert_eq!(report.copied_count(), 2);
        assert_eq!(report.failed_count(), 0);
        assert_eq!(
            remote.cell("sheet-1", "Copy of Template", CellAddress::new(2, 3)),
            Some(t("y"))
        );
        assert!(!session.guard.is_running());
    }

    #[test]
    fn test_missing_task_file_aborts() {
        let session = Session::new(SyncConfig::default(), "/elsewhere");
        let remote = MemoryClient::new();
        let err = session.run(&reader("/work/missing"), &remote).unwrap_err();
        assert!(matches!(err, BatchError::TaskTable(TaskTableError::NotFound(_))));
    }

    #[test]
    fn test_concurrent_run_is_refused() {
        let folder = "/work/concurrent";
        let session = Session::new(SyncConfig::default(), folder);
        let _held = session.guard.try_acquire().unwrap();
        let err = session
            .clone()
            .run(&reader(folder), &MemoryClient::new())
            .unwrap_err();
        assert!(matches!(err, BatchError::AlreadyRunning(_)));
    }

    #[test]
    fn test_sessions_on_one_folder_share_the_guard() {
        let folder = "/work/shared";
        let first = Session::new(SyncConfig::default(), folder);
        let second = Session::new(SyncConfig::default(), folder);
        let elsewhere = Session::new(SyncConfig::default(), "/work/unshared");

        let _held = first.acquire().unwrap();
        let err = second
            .run(&reader(folder), &MemoryClient::new())
            .unwrap_err();
        assert!(matches!(err, BatchError::AlreadyRunning(ref f) if f == Path::new(folder)));
        assert!(!elsewhere.guard.is_running());
    }

    #[test]
    fn test_run_plan_with_rehearsal_client() {
        let folder = "/work/rehearsal";
        let session = Session::new(SyncConfig::default(), folder);
        let reader = reader(folder);
        let table = session.load_table(&reader).unwrap();
        let plan = session.plan(&table);
        let client = rehearsal_client(&plan);

        let report = session
            .run_plan(table.path.clone(), plan, &reader, &client)
            .unwrap();
        assert_eq!(report.copied_count(), 2);
        assert_eq!(client.tabs("sheet-1"), ["Data", "Template", "Copy of Template"]);
    }

    #[test]
    fn test_rehearsal_client_mirrors_plan() {
        let folder = "/work/mirror";
        let session = Session::new(SyncConfig::default(), folder);
        let table = session.load_table(&reader(folder)).unwrap();
        let plan = session.plan(&table);
        let client = rehearsal_client(&plan);
        assert_eq!(client.tabs("sheet-1"), ["Data", "Template"]);
    }
}
