use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading a table from the Sheets API.
///
/// Every variant is terminal for the invocation; nothing is retried.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Spreadsheet service is unreachable: {0}")]
    Unreachable(String),
    #[error("Request rejected with status {status}: {message}")]
    RequestRejected { status: u16, message: String },
    #[error("Service account credential is invalid: {0}")]
    CredentialInvalid(String),
    #[error("Worksheet not found: {0}")]
    WorksheetNotFound(String),
    #[error("Failed to decode response from the spreadsheet service: {0}")]
    MalformedResponse(String),
}

/// Classifies a transport-level `reqwest` failure.
///
/// Body decoding problems on an otherwise successful response are reported as
/// `MalformedResponse`; everything else means the service could not be reached.
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::MalformedResponse(err.to_string())
        } else {
            FetchError::Unreachable(err.to_string())
        }
    }
}

/// Failures while persisting a table to disk.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to create directory '{}': {source}", path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write '{}': {source}", path.display())]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The error of a full fetch-then-write run.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    General(#[from] ::config::ConfigError),
    #[error("Configuration file not found: {0}")]
    NotFound(String),
}
