//! # Sheet Fetcher Integration Tests
//!
//! Drives `SheetFetcher` against a wiremock stand-in for the Sheets API and
//! the OAuth2 token endpoint.

use anyhow::Result;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::json;
use sheetdump::fetch::auth::AssertionClaims;
use sheetdump::{Credential, FetchError, Settings, SheetFetcher, SourceLocator, Table};
use sheetdump_test_utils::{
    unreachable_base_url, write_service_account_key, SheetsApiMock, TEST_ACCESS_TOKEN,
    TEST_CLIENT_EMAIL, TEST_PUBLIC_KEY_PEM, TOKEN_PATH,
};
use tempfile::tempdir;

const SPREADSHEET_ID: &str = "1AbCdEfGhIjKlMnOp";
const API_KEY: &str = "AIza-test-key";

fn fetcher_for(base_url: &str) -> Result<SheetFetcher> {
    Ok(SheetFetcher::new(Settings {
        api_base_url: base_url.to_string(),
        ..Settings::default()
    })?)
}

fn table(rows: &[&[&str]]) -> Table {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect::<Vec<Vec<String>>>()
        .into()
}

// --- Public (API key) access ---

#[tokio::test]
async fn test_public_fetch_returns_rows() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_public_values(
        SPREADSHEET_ID,
        "Sheet1",
        API_KEY,
        json!([["name", "qty"], ["apple", "3"], ["pear"]]),
    )
    .await;

    let fetcher = fetcher_for(&api.uri())?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1"),
            &Credential::ApiKey(API_KEY.to_string()),
        )
        .await?;

    assert_eq!(
        result,
        table(&[&["name", "qty"], &["apple", "3"], &["pear"]])
    );
    Ok(())
}

#[tokio::test]
async fn test_public_fetch_passes_a1_range_through() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_public_values(SPREADSHEET_ID, "Sheet1!A1:B2", API_KEY, json!([["a", "b"]]))
        .await;

    let fetcher = fetcher_for(&api.uri())?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1!A1:B2"),
            &Credential::ApiKey(API_KEY.to_string()),
        )
        .await?;

    assert_eq!(result, table(&[&["a", "b"]]));
    Ok(())
}

#[tokio::test]
async fn test_public_fetch_numeric_identifier_is_a_range_not_an_index() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_public_values(SPREADSHEET_ID, "1", API_KEY, json!([["from", "tab 1"]]))
        .await;

    let fetcher = fetcher_for(&api.uri())?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "1"),
            &Credential::ApiKey(API_KEY.to_string()),
        )
        .await?;

    assert_eq!(result, table(&[&["from", "tab 1"]]));
    let paths: Vec<String> = api
        .received()
        .await
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(paths, vec![format!("/v4/spreadsheets/{SPREADSHEET_ID}/values/1")]);
    Ok(())
}

#[tokio::test]
async fn test_public_fetch_keeps_blank_rows() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_public_values(SPREADSHEET_ID, "Sheet1", API_KEY, json!([["a"], [], ["b"]]))
        .await;

    let fetcher = fetcher_for(&api.uri())?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1"),
            &Credential::ApiKey(API_KEY.to_string()),
        )
        .await?;

    assert_eq!(result, table(&[&["a"], &[], &["b"]]));
    Ok(())
}

#[tokio::test]
async fn test_public_fetch_without_values_is_empty_table() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_public_values(SPREADSHEET_ID, "Empty", API_KEY, serde_json::Value::Null)
        .await;

    let fetcher = fetcher_for(&api.uri())?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Empty"),
            &Credential::ApiKey(API_KEY.to_string()),
        )
        .await?;

    assert!(result.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_public_fetch_empty_identifier_uses_first_sheet() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_public_metadata(SPREADSHEET_ID, API_KEY, &["Inventory", "Archive"])
        .await;
    api.mount_public_values(SPREADSHEET_ID, "'Inventory'", API_KEY, json!([["x"]]))
        .await;

    let fetcher = fetcher_for(&api.uri())?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, ""),
            &Credential::ApiKey(API_KEY.to_string()),
        )
        .await?;

    assert_eq!(result, table(&[&["x"]]));
    Ok(())
}

#[tokio::test]
async fn test_public_fetch_rejected_surfaces_google_message() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_api_error(
        SPREADSHEET_ID,
        403,
        "The caller does not have permission",
    )
    .await;

    let fetcher = fetcher_for(&api.uri())?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1"),
            &Credential::ApiKey(API_KEY.to_string()),
        )
        .await;

    match result {
        Err(FetchError::RequestRejected { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "The caller does not have permission");
        }
        other => panic!("Expected RequestRejected, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_fetch_unreachable_service() -> Result<()> {
    let fetcher = fetcher_for(&unreachable_base_url()?)?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1"),
            &Credential::ApiKey(API_KEY.to_string()),
        )
        .await;

    assert!(
        matches!(result, Err(FetchError::Unreachable(_))),
        "Expected Unreachable, got {result:?}"
    );
    Ok(())
}

// --- Private (service account) access ---

#[tokio::test]
async fn test_private_fetch_by_worksheet_name() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_token().await;
    api.mount_metadata(SPREADSHEET_ID, &["Summary", "Bob's data"])
        .await;
    api.mount_values(
        SPREADSHEET_ID,
        "'Bob''s%20data'",
        json!([["id", "note"], ["1", "a,b"], ["2", ""]]),
    )
    .await;

    let dir = tempdir()?;
    let key_path = write_service_account_key(dir.path(), &api.token_uri())?;

    let fetcher = fetcher_for(&api.uri())?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Bob's data"),
            &Credential::ServiceAccount(key_path),
        )
        .await?;

    assert_eq!(
        result,
        table(&[&["id", "note"], &["1", "a,b"], &["2", ""]])
    );
    Ok(())
}

#[tokio::test]
async fn test_private_fetch_by_index_and_default() -> Result<()> {
    let dir = tempdir()?;

    // Index 1 selects the second tab.
    let api = SheetsApiMock::start().await;
    api.mount_token().await;
    api.mount_metadata(SPREADSHEET_ID, &["First", "Second"]).await;
    api.mount_values(SPREADSHEET_ID, "'Second'", json!([["from second"]]))
        .await;
    let key_path = write_service_account_key(dir.path(), &api.token_uri())?;
    let result = fetcher_for(&api.uri())?
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "1"),
            &Credential::ServiceAccount(key_path),
        )
        .await?;
    assert_eq!(result, table(&[&["from second"]]));

    // No identifier selects the first tab.
    let api = SheetsApiMock::start().await;
    api.mount_token().await;
    api.mount_metadata(SPREADSHEET_ID, &["First", "Second"]).await;
    api.mount_values(SPREADSHEET_ID, "'First'", json!([["from first"]]))
        .await;
    let key_path = write_service_account_key(dir.path(), &api.token_uri())?;
    let result = fetcher_for(&api.uri())?
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, ""),
            &Credential::ServiceAccount(key_path),
        )
        .await?;
    assert_eq!(result, table(&[&["from first"]]));

    Ok(())
}

#[tokio::test]
async fn test_private_fetch_signs_expected_assertion() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_token().await;
    api.mount_metadata(SPREADSHEET_ID, &["Sheet1"]).await;
    api.mount_values(SPREADSHEET_ID, "'Sheet1'", json!([["ok"]]))
        .await;

    let dir = tempdir()?;
    let key_path = write_service_account_key(dir.path(), &api.token_uri())?;
    fetcher_for(&api.uri())?
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1"),
            &Credential::ServiceAccount(key_path),
        )
        .await?;

    let requests = api.received().await;
    let token_request = requests
        .iter()
        .find(|r| r.url.path() == TOKEN_PATH)
        .expect("token endpoint was not called");
    let form: Vec<(String, String)> = url::form_urlencoded::parse(&token_request.body)
        .into_owned()
        .collect();
    let assertion = form
        .iter()
        .find(|(k, _)| k == "assertion")
        .map(|(_, v)| v.clone())
        .expect("assertion parameter missing");

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[api.token_uri()]);
    let data = decode::<AssertionClaims>(
        &assertion,
        &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY_PEM.as_bytes())?,
        &validation,
    )?;
    assert_eq!(data.claims.iss, TEST_CLIENT_EMAIL);
    assert_eq!(
        data.claims.scope,
        "https://www.googleapis.com/auth/spreadsheets"
    );
    assert_eq!(data.claims.exp - data.claims.iat, 3600);

    let values_request = requests
        .iter()
        .find(|r| r.url.path().contains("/values/"))
        .expect("values endpoint was not called");
    assert_eq!(
        values_request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok()),
        Some(format!("Bearer {TEST_ACCESS_TOKEN}").as_str())
    );
    Ok(())
}

#[tokio::test]
async fn test_private_fetch_token_uri_override() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_token().await;
    api.mount_metadata(SPREADSHEET_ID, &["Sheet1"]).await;
    api.mount_values(SPREADSHEET_ID, "'Sheet1'", json!([["ok"]]))
        .await;

    // The key points at a dead endpoint; the override must win.
    let dir = tempdir()?;
    let dead = format!("{}{TOKEN_PATH}", unreachable_base_url()?);
    let key_path = write_service_account_key(dir.path(), &dead)?;

    let fetcher = SheetFetcher::new(Settings {
        api_base_url: api.uri(),
        token_uri: Some(api.token_uri()),
        ..Settings::default()
    })?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1"),
            &Credential::ServiceAccount(key_path),
        )
        .await?;
    assert_eq!(result, table(&[&["ok"]]));
    Ok(())
}

#[tokio::test]
async fn test_private_fetch_missing_worksheet() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_token().await;
    api.mount_metadata(SPREADSHEET_ID, &["Sheet1"]).await;

    let dir = tempdir()?;
    let key_path = write_service_account_key(dir.path(), &api.token_uri())?;
    let result = fetcher_for(&api.uri())?
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Missing"),
            &Credential::ServiceAccount(key_path),
        )
        .await;

    assert!(
        matches!(&result, Err(FetchError::WorksheetNotFound(name)) if name == "Missing"),
        "Expected WorksheetNotFound, got {result:?}"
    );
    Ok(())
}

#[tokio::test]
async fn test_private_fetch_token_rejected() -> Result<()> {
    let api = SheetsApiMock::start().await;
    api.mount_token_error(400, "Invalid JWT Signature.").await;

    let dir = tempdir()?;
    let key_path = write_service_account_key(dir.path(), &api.token_uri())?;
    let result = fetcher_for(&api.uri())?
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1"),
            &Credential::ServiceAccount(key_path),
        )
        .await;

    assert!(
        matches!(
            &result,
            Err(FetchError::RequestRejected { status: 400, message }) if message == "Invalid JWT Signature."
        ),
        "Expected RequestRejected, got {result:?}"
    );
    Ok(())
}

#[tokio::test]
async fn test_private_fetch_missing_key_file() -> Result<()> {
    let dir = tempdir()?;
    let fetcher = fetcher_for(&unreachable_base_url()?)?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1"),
            &Credential::ServiceAccount(dir.path().join("does-not-exist.json")),
        )
        .await;

    assert!(
        matches!(result, Err(FetchError::CredentialInvalid(_))),
        "Expected CredentialInvalid, got {result:?}"
    );
    Ok(())
}

#[tokio::test]
async fn test_private_fetch_malformed_key_file() -> Result<()> {
    let dir = tempdir()?;
    let key_path = dir.path().join("broken.json");
    std::fs::write(
        &key_path,
        r#"{"type":"service_account","client_email":"a@b.iam.gserviceaccount.com","private_key":"not a pem"}"#,
    )?;

    let fetcher = fetcher_for(&unreachable_base_url()?)?;
    let result = fetcher
        .fetch(
            &SourceLocator::new(SPREADSHEET_ID, "Sheet1"),
            &Credential::ServiceAccount(key_path),
        )
        .await;

    assert!(
        matches!(result, Err(FetchError::CredentialInvalid(_))),
        "Expected CredentialInvalid, got {result:?}"
    );
    Ok(())
}
