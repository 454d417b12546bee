//! Google Sheets v4 REST client (blocking)

use super::auth::Authenticator;
use super::{RemoteSpreadsheetClient, SpreadsheetInfo, quote_tab};
use crate::cell::CellAddress;
use crate::config::{RemoteConfig, ValueInput};
use crate::error::RemoteError;
use crate::range::ResolvedRange;
use crate::reader::ValueGrid;
use crate::state::Credentials;
use log::debug;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const METADATA_FIELDS: &str = "properties.title,sheets.properties(sheetId,title)";

/// Sheets API client authenticated with an OAuth bearer token
pub struct SheetsApiClient {
    http: Client,
    base_url: Url,
    auth: Authenticator,
    value_input: ValueInput,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    properties: Option<SpreadsheetProps>,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProps {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProps {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_cells: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl SheetsApiClient {
    pub fn new(config: &RemoteConfig, credentials: Credentials) -> Result<Self, RemoteError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            RemoteError::Transport(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            auth: Authenticator::new(credentials, &config.scopes),
            value_input: config.value_input,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        build_url(&self.base_url, segments)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let token = self.auth.bearer(&self.http)?;
        let response = request
            .bearer_auth(token)
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        check_status(response)
    }

    fn sheet_properties(
        &self,
        spreadsheet_id: &str,
    ) -> Result<(String, Vec<SheetProps>), RemoteError> {
        let url = self.url(&["v4", "spreadsheets", spreadsheet_id])?;
        debug!("GET {}", url);
        let meta: SpreadsheetMeta = self
            .send(self.http.get(url).query(&[("fields", METADATA_FIELDS)]))?
            .json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        let title = meta.properties.map(|p| p.title).unwrap_or_default();
        Ok((title, meta.sheets.into_iter().map(|s| s.properties).collect()))
    }

    fn sheet_id(&self, spreadsheet_id: &str, tab: &str) -> Result<i64, RemoteError> {
        let (_, sheets) = self.sheet_properties(spreadsheet_id)?;
        sheets
            .iter()
            .find(|s| s.title == tab)
            .map(|s| s.sheet_id)
            .ok_or_else(|| {
                RemoteError::NotFound(format!("tab '{tab}' in spreadsheet {spreadsheet_id}"))
            })
    }

    fn batch_update(&self, spreadsheet_id: &str, request: Value) -> Result<Value, RemoteError> {
        let batch = format!("{spreadsheet_id}:batchUpdate");
        let url = self.url(&["v4", "spreadsheets", &batch])?;
        debug!("POST {} {}", url, request);
        self.send(self.http.post(url).json(&json!({ "requests": [request] })))?
            .json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

impl RemoteSpreadsheetClient for SheetsApiClient {
    fn open_spreadsheet(&self, spreadsheet_id: &str) -> Result<SpreadsheetInfo, RemoteError> {
        let (title, sheets) = self.sheet_properties(spreadsheet_id)?;
        Ok(SpreadsheetInfo {
            id: spreadsheet_id.to_string(),
            title,
            tabs: sheets.into_iter().map(|s| s.title).collect(),
        })
    }

    fn delete_tab(&self, spreadsheet_id: &str, tab: &str) -> Result<(), RemoteError> {
        let sheet_id = self.sheet_id(spreadsheet_id, tab)?;
        self.batch_update(spreadsheet_id, json!({ "deleteSheet": { "sheetId": sheet_id } }))?;
        Ok(())
    }

    fn duplicate_tab(
        &self,
        spreadsheet_id: &str,
        source_tab: &str,
        new_tab: &str,
    ) -> Result<String, RemoteError> {
        let source_id = self.sheet_id(spreadsheet_id, source_tab)?;
        let reply = self.batch_update(
            spreadsheet_id,
            json!({
                "duplicateSheet": {
                    "sourceSheetId": source_id,
                    "newSheetName": new_tab,
                }
            }),
        )?;
        Ok(duplicated_title(&reply).unwrap_or_else(|| new_tab.to_string()))
    }

    fn write_range(
        &self,
        spreadsheet_id: &str,
        tab: &str,
        top_left: CellAddress,
        values: &ValueGrid,
    ) -> Result<u64, RemoteError> {
        let Some(range) = a1_range(tab, top_left, values) else {
            return Ok(0);
        };
        let url = self.url(&["v4", "spreadsheets", spreadsheet_id, "values", &range])?;
        debug!("PUT {} ({}x{})", url, values.height(), values.width());
        let reply: UpdateValuesResponse = self
            .send(
                self.http
                    .put(url)
                    .query(&[("valueInputOption", self.value_input.as_str())])
                    .json(&write_body(&range, values)),
            )?
            .json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Ok(reply.updated_cells)
    }
}

fn build_url(base: &Url, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RemoteError::Transport(format!("base URL '{base}' cannot hold a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `'Tab'!B2:D5` for a block of values anchored at `top_left`; `None` when
/// there is nothing to write
fn a1_range(tab: &str, top_left: CellAddress, values: &ValueGrid) -> Option<String> {
    let window = ResolvedRange::anchored_at(top_left, values.height(), values.width())?;
    Some(format!("{}!{}", quote_tab(tab), window.to_a1()))
}

fn write_body(range: &str, values: &ValueGrid) -> Value {
    json!({
        "range": range,
        "majorDimension": "ROWS",
        "values": values.to_json(),
    })
}

fn duplicated_title(reply: &Value) -> Option<String> {
    reply
        .pointer("/replies/0/duplicateSheet/properties/title")?
        .as_str()
        .map(str::to_string)
}

fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(error_for_status(status.as_u16(), &body))
}

fn error_for_status(status: u16, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    match status {
        404 => RemoteError::NotFound(message),
        401 | 403 => RemoteError::PermissionDenied(message),
        429 => RemoteError::QuotaExceeded(message),
        _ => RemoteError::Api { status, message },
    }
}
