//! Remote spreadsheet access

use crate::cell::CellAddress;
use crate::error::RemoteError;
use crate::reader::ValueGrid;
use std::collections::BTreeSet;

#[cfg(feature = "sheets-api")]
pub mod auth;
pub mod memory;
#[cfg(feature = "sheets-api")]
pub mod sheets_api;

#[cfg(feature = "sheets-api")]
pub use auth::Authenticator;
pub use memory::{MemoryClient, RemoteOp};
#[cfg(feature = "sheets-api")]
pub use sheets_api::SheetsApiClient;

/// Basic metadata of a remote spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetInfo {
    pub id: String,
    pub title: String,
    pub tabs: Vec<String>,
}

/// Operations the transfer pipeline needs from a cloud spreadsheet service
pub trait RemoteSpreadsheetClient {
    /// Fetch metadata; fails with `NotFound` for an unknown id
    fn open_spreadsheet(&self, spreadsheet_id: &str) -> Result<SpreadsheetInfo, RemoteError>;

    fn list_tabs(&self, spreadsheet_id: &str) -> Result<BTreeSet<String>, RemoteError> {
        Ok(self
            .open_spreadsheet(spreadsheet_id)?
            .tabs
            .into_iter()
            .collect())
    }

    fn delete_tab(&self, spreadsheet_id: &str, tab: &str) -> Result<(), RemoteError>;

    /// Copy `source_tab` (values and formatting) into a new tab; returns its name
    fn duplicate_tab(
        &self,
        spreadsheet_id: &str,
        source_tab: &str,
        new_tab: &str,
    ) -> Result<String, RemoteError>;

    /// Write `values` with their top-left corner at `top_left`; returns the
    /// number of cells written
    fn write_range(
        &self,
        spreadsheet_id: &str,
        tab: &str,
        top_left: CellAddress,
        values: &ValueGrid,
    ) -> Result<u64, RemoteError>;
}

/// Quote a tab name for an A1 range: `My Tab` -> `'My Tab'`, `O'Neil` -> `'O''Neil'`
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}
