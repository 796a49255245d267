//! Shared fixtures for the `sheetdump` test suites: a throwaway RSA key pair,
//! service account key files, and a wiremock stand-in for the Sheets API.

use anyhow::Result;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use wiremock::matchers::{body_string_contains, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// PKCS#8 private key used only by tests.
pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/test_private_key.pem");
/// Public half of `TEST_PRIVATE_KEY_PEM`, for verifying signed assertions.
pub const TEST_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/test_public_key.pem");

pub const TEST_CLIENT_EMAIL: &str = "exporter@sheetdump-test.iam.gserviceaccount.com";
pub const TEST_ACCESS_TOKEN: &str = "ya29.test-access-token";
pub const TOKEN_PATH: &str = "/token";

// --- Service Account Keys ---

/// Renders a service account key in Google's JSON layout.
pub fn service_account_json(token_uri: &str) -> String {
    json!({
        "type": "service_account",
        "project_id": "sheetdump-test",
        "private_key_id": "test-key-id",
        "private_key": TEST_PRIVATE_KEY_PEM,
        "client_email": TEST_CLIENT_EMAIL,
        "client_id": "100000000000000000000",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": token_uri,
    })
    .to_string()
}

/// Writes a service account key into `dir` and returns its path.
pub fn write_service_account_key(dir: &Path, token_uri: &str) -> Result<PathBuf> {
    let key_path = dir.join("service_account.json");
    std::fs::write(&key_path, service_account_json(token_uri))?;
    Ok(key_path)
}

/// Returns a base URL nothing is listening on.
pub fn unreachable_base_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(format!("http://127.0.0.1:{port}"))
}

// --- Mock Sheets API ---

/// A mock Sheets v4 API plus OAuth2 token endpoint on one server.
pub struct SheetsApiMock {
    pub server: MockServer,
}

impl SheetsApiMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn token_uri(&self) -> String {
        format!("{}{TOKEN_PATH}", self.server.uri())
    }

    /// Issues `TEST_ACCESS_TOKEN` for any JWT bearer grant.
    pub async fn mount_token(&self) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": TEST_ACCESS_TOKEN,
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Answers the token endpoint with an OAuth2 error.
    pub async fn mount_token_error(&self, status: u16, description: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": description
            })))
            .mount(&self.server)
            .await;
    }

    /// Serves worksheet metadata to bearer-authenticated callers.
    pub async fn mount_metadata(&self, spreadsheet_id: &str, titles: &[&str]) {
        Mock::given(method("GET"))
            .and(path(format!("/v4/spreadsheets/{spreadsheet_id}")))
            .and(query_param("fields", "sheets.properties"))
            .and(header("authorization", format!("Bearer {TEST_ACCESS_TOKEN}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_body(titles)))
            .mount(&self.server)
            .await;
    }

    /// Serves worksheet metadata to callers presenting `api_key`.
    pub async fn mount_public_metadata(
        &self,
        spreadsheet_id: &str,
        api_key: &str,
        titles: &[&str],
    ) {
        Mock::given(method("GET"))
            .and(path(format!("/v4/spreadsheets/{spreadsheet_id}")))
            .and(query_param("key", api_key))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_body(titles)))
            .mount(&self.server)
            .await;
    }

    /// Serves `values` for a bearer-authenticated `values.get`.
    ///
    /// `encoded_range` must match the request path exactly, i.e. be percent-encoded.
    pub async fn mount_values(&self, spreadsheet_id: &str, encoded_range: &str, values: Value) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/v4/spreadsheets/{spreadsheet_id}/values/{encoded_range}"
            )))
            .and(header("authorization", format!("Bearer {TEST_ACCESS_TOKEN}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(value_range_body(values)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Serves `values` for a `values.get` authorized with `api_key`.
    pub async fn mount_public_values(
        &self,
        spreadsheet_id: &str,
        encoded_range: &str,
        api_key: &str,
        values: Value,
    ) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/v4/spreadsheets/{spreadsheet_id}/values/{encoded_range}"
            )))
            .and(query_param("key", api_key))
            .respond_with(ResponseTemplate::new(200).set_body_json(value_range_body(values)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Answers every request under `/v4/spreadsheets/{id}` with a Google error.
    pub async fn mount_api_error(&self, spreadsheet_id: &str, status: u16, message: &str) {
        Mock::given(method("GET"))
            .and(path_regex(format!(
                "^/v4/spreadsheets/{spreadsheet_id}(/.*)?$"
            )))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "code": status, "message": message, "status": "ERROR" }
            })))
            .mount(&self.server)
            .await;
    }

    /// All requests the mock has received so far.
    pub async fn received(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

fn metadata_body(titles: &[&str]) -> Value {
    let sheets: Vec<Value> = titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            let sheet_id = index as i64 * 1000;
            json!({ "properties": { "sheetId": sheet_id, "title": title, "index": index } })
        })
        .collect();
    json!({ "sheets": sheets })
}

/// A `values.get` body; `Value::Null` leaves out `values` like the API does
/// for an empty range.
fn value_range_body(values: Value) -> Value {
    if values.is_null() {
        json!({ "range": "Sheet1!A1:Z1000", "majorDimension": "ROWS" })
    } else {
        json!({ "range": "Sheet1!A1:Z1000", "majorDimension": "ROWS", "values": values })
    }
}
