//! # `sheetdump-cli` Library Crate
//!
//! Argument parsing and command handling for the `sheetdump` binary. The
//! binary itself only sets up logging and maps the result to an exit code.

use anyhow::{Context, Result};
use clap::Parser;
use sheetdump::{export, Credential, CsvSink, Settings, SheetFetcher, SourceLocator, WriteOutcome};
use std::path::PathBuf;
use tracing::info;

// --- CLI Definition ---

/// Fetch data from Google Sheets (public or private) and write it to CSV.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Google Sheets API key, or the service account JSON key path with --private
    pub credential: String,
    /// Google Sheets spreadsheet ID
    pub spreadsheet_id: String,
    /// Worksheet name or A1 range; with --private, a worksheet name or zero-based index.
    /// An empty string selects the first worksheet
    pub sheet: String,
    /// Path of the CSV file to write
    pub csv_file: PathBuf,
    /// Read a private spreadsheet through a service account
    #[arg(long)]
    pub private: bool,
    /// Optional YAML settings file
    #[arg(long, env = "SHEETDUMP_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn credential(&self) -> Credential {
        if self.private {
            Credential::ServiceAccount(PathBuf::from(&self.credential))
        } else {
            Credential::ApiKey(self.credential.clone())
        }
    }

    pub fn locator(&self) -> SourceLocator {
        SourceLocator::new(&self.spreadsheet_id, &self.sheet)
    }
}

// --- Public Entrypoint ---

/// Runs one fetch-and-write and returns the line to report on success.
pub async fn run(cli: Cli) -> Result<String> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    info!("Using Sheets API at {}", settings.api_base_url);

    let fetcher = SheetFetcher::new(settings)?;
    let locator = cli.locator();
    let outcome = export(
        &fetcher,
        &CsvSink::new(),
        &locator,
        &cli.credential(),
        &cli.csv_file,
    )
    .await
    .with_context(|| format!("Failed to export sheet '{locator}'"))?;

    Ok(status_line(&outcome, &cli.csv_file))
}

fn status_line(outcome: &WriteOutcome, csv_file: &std::path::Path) -> String {
    match outcome {
        WriteOutcome::Written { rows } => format!(
            "✅ Data successfully written to {} ({rows} rows).",
            csv_file.display()
        ),
        WriteOutcome::Empty => format!(
            "🤷 No data found; wrote empty file {}.",
            csv_file.display()
        ),
    }
}
