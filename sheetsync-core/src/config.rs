//! Configuration for task-table layout, planning and remote access

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration, usually loaded from `sheetsync.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub task_table: TaskTableConfig,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub executor: ExecutorSettings,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl SyncConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SyncConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every row unusable
    pub fn validate(&self) -> Result<()> {
        if self.task_table.header_row == 0 {
            anyhow::bail!(
                "Configuration error: task_table.header_row is 1-based and must be >= 1"
            );
        }

        let columns = &self.task_table.columns;
        let headers = columns.all();
        for (field, header) in &headers {
            if header.trim().is_empty() {
                anyhow::bail!("Configuration error: column header for '{}' is empty", field);
            }
        }
        for (i, (field, header)) in headers.iter().enumerate() {
            let duplicate = headers[i + 1..]
                .iter()
                .find(|(_, h)| h.trim() == header.trim());
            if let Some((other, _)) = duplicate {
                anyhow::bail!(
                    "Configuration error: '{}' and '{}' share the column header '{}'",
                    field,
                    other,
                    header
                );
            }
        }

        if self.planner.create_sentinel.trim().is_empty() {
            anyhow::bail!("Configuration error: planner.create_sentinel must not be empty");
        }
        if self.executor.max_cells == 0 {
            anyhow::bail!("Configuration error: executor.max_cells must be >= 1");
        }
        Ok(())
    }
}

/// Where the task table lives and how its header is laid out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskTableConfig {
    /// File name inside the source folder
    pub file_name: String,
    /// 1-based sheet row holding the column headers; rows above it are ignored
    pub header_row: u32,
    pub columns: ColumnNames,
}

impl Default for TaskTableConfig {
    fn default() -> Self {
        Self {
            file_name: "Task File.xlsx".to_string(),
            header_row: 2,
            columns: ColumnNames::default(),
        }
    }
}

/// Header text of each task-table column. Matched exactly after trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub source_file: String,
    pub source_start: String,
    pub source_end: String,
    pub spreadsheet_id: String,
    pub tab: String,
    pub template_tab: String,
    pub dest_start: String,
}

impl ColumnNames {
    /// (field name, header) pairs in task-table order
    pub fn all(&self) -> [(&'static str, &str); 7] {
        [
            ("source_file", self.source_file.as_str()),
            ("source_start", self.source_start.as_str()),
            ("source_end", self.source_end.as_str()),
            ("spreadsheet_id", self.spreadsheet_id.as_str()),
            ("tab", self.tab.as_str()),
            ("template_tab", self.template_tab.as_str()),
            ("dest_start", self.dest_start.as_str()),
        ]
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            source_file: "Source Excell Spreadsheet".to_string(),
            source_start: "Starting CELL".to_string(),
            source_end: "Ending CELL * means all".to_string(),
            spreadsheet_id: "Google Sheet ID".to_string(),
            tab: "Tab".to_string(),
            template_tab: "Duplicate Tab".to_string(),
            dest_start: "Starting Cell".to_string(),
        }
    }
}

/// Settings for turning task rows into records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Tab value (case-insensitive) that requests a duplicate of the template tab
    pub create_sentinel: String,
    /// Prefix of the duplicated tab's name
    pub copy_prefix: String,
    /// Leading sheet rows missing from loaded source grids. Subtracted from
    /// every source cell reference; destination cells are never shifted.
    pub source_row_offset: u32,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            create_sentinel: "create new".to_string(),
            copy_prefix: "Copy of ".to_string(),
            source_row_offset: 0,
        }
    }
}

/// Cell limit of a single Google Sheets spreadsheet
pub const SHEETS_CELL_LIMIT: u64 = 10_000_000;

/// Settings for running records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Skip the existence check for named destination tabs
    pub skip_tab_check: bool,
    /// Largest source window a single record may copy
    pub max_cells: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            skip_tab_check: false,
            max_cells: SHEETS_CELL_LIMIT,
        }
    }
}

/// Locations of persisted process state, relative to the working directory
/// unless absolute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub folder_cache: PathBuf,
    pub credentials: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            folder_cache: PathBuf::from("xlFile.txt"),
            credentials: PathBuf::from("service_account.json"),
        }
    }
}

/// How the Sheets API interprets written values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInput {
    /// Stored verbatim as text or numbers
    Raw,
    /// Parsed as if typed into the UI, so dates become date cells
    #[default]
    UserEntered,
}

impl ValueInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInput::Raw => "RAW",
            ValueInput::UserEntered => "USER_ENTERED",
        }
    }
}

/// Remote API endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub value_input: ValueInput,
    /// OAuth scopes requested when signing in with a service-account key
    pub scopes: Vec<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com".to_string(),
            timeout_secs: 60,
            value_input: ValueInput::default(),
            scopes: vec![
                "https://www.googleapis.com/auth/drive".to_string(),
                "https://www.googleapis.com/auth/spreadsheets".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_task_file_layout() {
        let config = SyncConfig::default();
        assert_eq!(config.task_table.header_row, 2);
        assert_eq!(config.task_table.columns.source_start, "Starting CELL");
        assert_eq!(config.task_table.columns.dest_start, "Starting Cell");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [task_table]
            header_row = 1

            [task_table.columns]
            tab = "Destination Tab"

            [planner]
            copy_prefix = "Backup - "

            [remote]
            value_input = "RAW"
            "#,
        )
        .unwrap();

        assert_eq!(config.task_table.header_row, 1);
        assert_eq!(config.task_table.file_name, "Task File.xlsx");
        assert_eq!(config.task_table.columns.tab, "Destination Tab");
        assert_eq!(config.task_table.columns.source_file, "Source Excell Spreadsheet");
        assert_eq!(config.planner.copy_prefix, "Backup - ");
        assert_eq!(config.planner.create_sentinel, "create new");
        assert_eq!(config.remote.base_url, "https://sheets.googleapis.com");
        assert_eq!(config.remote.value_input, ValueInput::Raw);
        assert_eq!(config.remote.scopes.len(), 2);
        assert_eq!(config.executor.max_cells, SHEETS_CELL_LIMIT);
    }

    #[test]
    fn test_validation() {
        let config = SyncConfig::default();

        let mut bad_config = config.clone();
        bad_config.task_table.header_row = 0;
        assert!(bad_config.validate().is_err());

        let mut bad_config = config.clone();
        bad_config.task_table.columns.tab = " Starting Cell ".to_string();
        assert!(bad_config.validate().is_err());

        let mut bad_config = config.clone();
        bad_config.task_table.columns.template_tab = String::new();
        assert!(bad_config.validate().is_err());

        let mut bad_config = config.clone();
        bad_config.planner.create_sentinel = "  ".to_string();
        assert!(bad_config.validate().is_err());

        let mut bad_config = config;
        bad_config.executor.max_cells = 0;
        assert!(bad_config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheetsync.toml");
        fs::write(&path, "[state]\nfolder_cache = \"cache.txt\"\n").unwrap();
        let config = SyncConfig::from_file(&path).unwrap();
        assert_eq!(config.state.folder_cache, PathBuf::from("cache.txt"));

        fs::write(&path, "[task_table]\nheader_row = 0\n").unwrap();
        assert!(SyncConfig::from_file(&path).is_err());
    }
}
