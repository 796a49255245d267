//! # Sheet Fetching
//!
//! `SheetFetcher` reads one worksheet from the Google Sheets v4 API and
//! returns it as a `Table`. Public spreadsheets are read with an API key;
//! private ones through a service account session. Both paths end in the same
//! `spreadsheets.values.get` call and the same `Table` shape.
//!
//! Every HTTP call is attempted exactly once.

mod api;
pub mod auth;

use crate::errors::FetchError;
use crate::settings::Settings;
use crate::types::{Credential, SourceLocator, Table};
use api::{rejection, SpreadsheetMetadata, ValueRange};
use auth::ServiceAccountKey;
use reqwest::{Client as ReqwestClient, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info};

/// Authorization attached to each Sheets API request.
enum Access<'a> {
    Key(&'a str),
    Bearer(String),
}

impl Access<'_> {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Access::Key(key) => request.query(&[("key", key)]),
            Access::Bearer(token) => request.bearer_auth(token),
        }
    }
}

/// Reads worksheets from the Sheets API.
#[derive(Clone, Debug)]
pub struct SheetFetcher {
    client: ReqwestClient,
    settings: Settings,
}

impl SheetFetcher {
    /// Creates a new `SheetFetcher` for the endpoints in `settings`.
    pub fn new(settings: Settings) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(|e| FetchError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: ReqwestClient, settings: Settings) -> Self {
        Self { client, settings }
    }

    /// Fetches the worksheet named by `locator`.
    ///
    /// A worksheet without values yields an empty `Table`, not an error.
    pub async fn fetch(
        &self,
        locator: &SourceLocator,
        credential: &Credential,
    ) -> Result<Table, FetchError> {
        info!("Fetching sheet '{locator}'");
        let table = match credential {
            Credential::ApiKey(key) => self.fetch_public(locator, key).await?,
            Credential::ServiceAccount(path) => self.fetch_private(locator, path).await?,
        };
        info!("Fetched {} rows from '{locator}'", table.len());
        Ok(table)
    }

    /// Reads a publicly shared spreadsheet. The sheet identifier is used as the
    /// range verbatim, so any A1 range works; an empty identifier resolves to
    /// the first worksheet.
    async fn fetch_public(
        &self,
        locator: &SourceLocator,
        api_key: &str,
    ) -> Result<Table, FetchError> {
        let access = Access::Key(api_key);
        let range = if locator.sheet.is_empty() {
            let metadata = self.metadata(&locator.spreadsheet_id, &access).await?;
            quote_sheet_title(&metadata.select("")?.title)
        } else {
            locator.sheet.clone()
        };
        self.values(&locator.spreadsheet_id, &range, &access).await
    }

    /// Reads a private spreadsheet through a service account session.
    async fn fetch_private(
        &self,
        locator: &SourceLocator,
        key_path: &Path,
    ) -> Result<Table, FetchError> {
        let key = ServiceAccountKey::from_file(key_path).await?;
        debug!("Loaded service account key: {key:?}");
        let token = auth::request_access_token(
            &self.client,
            &key,
            &self.settings.scope,
            self.settings.token_uri.as_deref(),
        )
        .await?;
        let access = Access::Bearer(token);

        let metadata = self.metadata(&locator.spreadsheet_id, &access).await?;
        let worksheet = metadata.select(&locator.sheet)?;
        debug!(
            "Selected worksheet '{}' (sheetId {}, index {})",
            worksheet.title, worksheet.sheet_id, worksheet.index
        );
        let range = quote_sheet_title(&worksheet.title);
        self.values(&locator.spreadsheet_id, &range, &access).await
    }

    async fn metadata(
        &self,
        spreadsheet_id: &str,
        access: &Access<'_>,
    ) -> Result<SpreadsheetMetadata, FetchError> {
        let url = self.endpoint(&["v4", "spreadsheets", spreadsheet_id])?;
        let request = self.client.get(url).query(&[("fields", "sheets.properties")]);
        self.send_json(access.apply(request)).await
    }

    async fn values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        access: &Access<'_>,
    ) -> Result<Table, FetchError> {
        let url = self.endpoint(&["v4", "spreadsheets", spreadsheet_id, "values", range])?;
        let value_range: ValueRange = self.send_json(access.apply(self.client.get(url))).await?;
        debug!("Received value range {:?}", value_range.range);
        Ok(Table::new(value_range.into_rows()))
    }

    /// Sends a request and decodes a JSON body, mapping non-success statuses
    /// to `RequestRejected`.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status.as_u16(), &body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))
    }

    /// Joins percent-encoded path segments onto the API base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.settings.api_base_url).map_err(|e| {
            FetchError::Unreachable(format!(
                "invalid API base URL '{}': {e}",
                self.settings.api_base_url
            ))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::Unreachable(format!(
                    "API base URL '{}' cannot carry a path",
                    self.settings.api_base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Quotes a worksheet title for use as an A1 range, doubling embedded quotes.
fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}
