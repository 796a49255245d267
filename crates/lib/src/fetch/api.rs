//! Wire structures of the Sheets v4 and OAuth2 token endpoints.

use crate::errors::FetchError;
use serde::Deserialize;
use serde_json::Value;

/// Response of `spreadsheets.values.get`. `values` is omitted for empty ranges.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<Vec<Value>>>,
}

impl ValueRange {
    pub(crate) fn into_rows(self) -> Vec<Vec<String>> {
        self.values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect()
    }
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Response of `spreadsheets.get` restricted to `sheets.properties`.
#[derive(Deserialize, Debug)]
pub(crate) struct SpreadsheetMetadata {
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SheetEntry {
    pub properties: SheetProperties,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: i64,
}

impl SpreadsheetMetadata {
    /// Worksheet titles in tab order.
    pub(crate) fn ordered(&self) -> Vec<&SheetProperties> {
        let mut sheets: Vec<&SheetProperties> = self.sheets.iter().map(|s| &s.properties).collect();
        sheets.sort_by_key(|p| p.index);
        sheets
    }

    /// Picks a worksheet by exact title, then by zero-based position.
    /// An empty identifier selects the first worksheet.
    pub(crate) fn select(&self, identifier: &str) -> Result<&SheetProperties, FetchError> {
        let sheets = self.ordered();
        if identifier.is_empty() {
            return sheets.first().copied().ok_or_else(|| {
                FetchError::WorksheetNotFound("the spreadsheet has no worksheets".to_string())
            });
        }
        if let Some(found) = sheets.iter().find(|p| p.title == identifier) {
            return Ok(*found);
        }
        identifier
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|position| sheets.get(position).copied())
            .ok_or_else(|| FetchError::WorksheetNotFound(identifier.to_string()))
    }
}

/// Successful response of the OAuth2 token endpoint.
#[derive(Deserialize, Debug)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Deserialize, Debug)]
struct GoogleErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Builds a `RequestRejected` error, preferring the message from Google's
/// JSON error body over the raw text.
pub(crate) fn rejection(status: u16, body: &str) -> FetchError {
    let message = serde_json::from_str::<GoogleErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .or_else(|| {
            serde_json::from_str::<OAuthErrorBody>(body)
                .ok()
                .map(|e| e.error_description.unwrap_or(e.error))
        })
        .unwrap_or_else(|| body.trim().to_string());
    FetchError::RequestRejected { status, message }
}
