//! # Runtime Settings
//!
//! Endpoint and OAuth settings for the fetcher, resolved from three layers:
//! built-in defaults, an optional YAML file, and `SHEETDUMP_*` environment
//! variables (highest precedence).

use crate::errors::ConfigError;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com";
/// See, edit, create, and delete all Google Sheets spreadsheets.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the Sheets REST API. Loaded from `SHEETDUMP_API_BASE_URL`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// OAuth scope requested for service account sessions.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Overrides the `token_uri` found in the service account key.
    #[serde(default)]
    pub token_uri: Option<String>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            scope: default_scope(),
            token_uri: None,
        }
    }
}

impl Settings {
    /// Loads settings, layering an optional YAML file and the environment over
    /// the defaults.
    ///
    /// An explicitly named file that does not exist is an error rather than
    /// being silently skipped.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("scope", DEFAULT_SCOPE)?;

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            info!("Loading settings from '{}'.", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("SHEETDUMP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut settings: Settings = settings.try_deserialize()?;
        settings.api_base_url = settings.api_base_url.trim_end_matches('/').to_string();
        Ok(settings)
    }
}
