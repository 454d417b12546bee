//! In-memory remote client for tests and dry runs

use super::{RemoteSpreadsheetClient, SpreadsheetInfo};
use crate::cell::CellAddress;
use crate::error::RemoteError;
use crate::range::ResolvedRange;
use crate::reader::{CellValue, ValueGrid};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// A mutating call received by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Delete { spreadsheet_id: String, tab: String },
    Duplicate { spreadsheet_id: String, source: String, new_tab: String },
    Write { spreadsheet_id: String, tab: String, range: String },
}

#[derive(Debug, Default, Clone)]
struct Tab {
    cells: HashMap<(u32, u32), CellValue>,
}

#[derive(Debug, Default)]
struct State {
    // Tab order is preserved as a list of names next to the map
    spreadsheets: BTreeMap<String, (Vec<String>, HashMap<String, Tab>)>,
    ops: Vec<RemoteOp>,
    metadata_reads: usize,
}

/// Spreadsheets kept in memory. Cloning tabs copies their cells.
#[derive(Debug, Default)]
pub struct MemoryClient {
    state: Mutex<State>,
    denied: Vec<String>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spreadsheet with empty tabs
    pub fn with_spreadsheet(self, id: &str, tabs: &[&str]) -> Self {
        self.add_spreadsheet(id, tabs);
        self
    }

    /// Make every call against `id` fail with `PermissionDenied`
    pub fn deny(mut self, id: &str) -> Self {
        self.denied.push(id.to_string());
        self
    }

    /// Add a spreadsheet, or the missing tabs of an existing one
    pub fn add_spreadsheet(&self, id: &str, tabs: &[&str]) {
        let mut state = self.lock();
        let (order, map) = state.spreadsheets.entry(id.to_string()).or_default();
        for tab in tabs {
            if !map.contains_key(*tab) {
                order.push(tab.to_string());
                map.insert(tab.to_string(), Tab::default());
            }
        }
    }

    /// Value stored at a cell, if any
    pub fn cell(&self, id: &str, tab: &str, addr: CellAddress) -> Option<CellValue> {
        let state = self.lock();
        let (_, map) = state.spreadsheets.get(id)?;
        map.get(tab)?.cells.get(&(addr.row, addr.col)).cloned()
    }

    /// Tab names in creation order
    pub fn tabs(&self, id: &str) -> Vec<String> {
        let state = self.lock();
        state
            .spreadsheets
            .get(id)
            .map(|(order, _)| order.clone())
            .unwrap_or_default()
    }

    /// Mutating calls received so far
    pub fn ops(&self) -> Vec<RemoteOp> {
        self.lock().ops.clone()
    }

    /// Number of `open_spreadsheet` calls, including those made by `list_tabs`
    pub fn metadata_reads(&self) -> usize {
        self.lock().metadata_reads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_access(&self, id: &str) -> Result<(), RemoteError> {
        if self.denied.iter().any(|d| d == id) {
            return Err(RemoteError::PermissionDenied(format!("spreadsheet {id}")));
        }
        Ok(())
    }
}

fn not_found_sheet(id: &str) -> RemoteError {
    RemoteError::NotFound(format!("spreadsheet {id}"))
}

fn not_found_tab(id: &str, tab: &str) -> RemoteError {
    RemoteError::NotFound(format!("tab '{tab}' in spreadsheet {id}"))
}

impl RemoteSpreadsheetClient for MemoryClient {
    fn open_spreadsheet(&self, spreadsheet_id: &str) -> Result<SpreadsheetInfo, RemoteError> {
        self.check_access(spreadsheet_id)?;
        let mut state = self.lock();
        state.metadata_reads += 1;
        let (order, _) = state
            .spreadsheets
            .get(spreadsheet_id)
            .ok_or_else(|| not_found_sheet(spreadsheet_id))?;
        Ok(SpreadsheetInfo {
            id: spreadsheet_id.to_string(),
            title: spreadsheet_id.to_string(),
            tabs: order.clone(),
        })
    }

    fn delete_tab(&self, spreadsheet_id: &str, tab: &str) -> Result<(), RemoteError> {
        self.check_access(spreadsheet_id)?;
        let mut state = self.lock();
        let (order, map) = state
            .spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(|| not_found_sheet(spreadsheet_id))?;
        map.remove(tab).ok_or_else(|| not_found_tab(spreadsheet_id, tab))?;
        order.retain(|t| t != tab);
        state.ops.push(RemoteOp::Delete {
            spreadsheet_id: spreadsheet_id.to_string(),
            tab: tab.to_string(),
        });
        Ok(())
    }

    fn duplicate_tab(
        &self,
        spreadsheet_id: &str,
        source_tab: &str,
        new_tab: &str,
    ) -> Result<String, RemoteError> {
        self.check_access(spreadsheet_id)?;
        let mut state = self.lock();
        let (order, map) = state
            .spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(|| not_found_sheet(spreadsheet_id))?;
        let copy = map
            .get(source_tab)
            .cloned()
            .ok_or_else(|| not_found_tab(spreadsheet_id, source_tab))?;
        if map.contains_key(new_tab) {
            return Err(RemoteError::Api {
                status: 400,
                message: format!("A sheet with the name \"{new_tab}\" already exists"),
            });
        }
        map.insert(new_tab.to_string(), copy);
        order.push(new_tab.to_string());
        state.ops.push(RemoteOp::Duplicate {
            spreadsheet_id: spreadsheet_id.to_string(),
            source: source_tab.to_string(),
            new_tab: new_tab.to_string(),
        });
        Ok(new_tab.to_string())
    }

    fn write_range(
        &self,
        spreadsheet_id: &str,
        tab: &str,
        top_left: CellAddress,
        values: &ValueGrid,
    ) -> Result<u64, RemoteError> {
        self.check_access(spreadsheet_id)?;
        let mut state = self.lock();
        let (_, map) = state
            .spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(|| not_found_sheet(spreadsheet_id))?;
        let target = map
            .get_mut(tab)
            .ok_or_else(|| not_found_tab(spreadsheet_id, tab))?;

        let mut written = 0u64;
        for (r, row) in values.rows().iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let key = (top_left.row + r as u32, top_left.col + c as u32);
                // Empty strings clear the cell, same as the real API
                if value.is_empty() {
                    target.cells.remove(&key);
                } else {
                    target.cells.insert(key, value.clone());
                }
                written += 1;
            }
        }

        let range = ResolvedRange::anchored_at(top_left, values.height(), values.width())
            .map(|w| w.to_a1())
            .unwrap_or_else(|| top_left.to_notation());
        state.ops.push(RemoteOp::Write {
            spreadsheet_id: spreadsheet_id.to_string(),
            tab: tab.to_string(),
            range,
        });
        Ok(written)
    }
}
