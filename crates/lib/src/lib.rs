//! # sheetdump
//!
//! Reads a worksheet from Google Sheets, either publicly with an API key or
//! privately with a service account, and writes it to a CSV file.
//!
//! The crate is split into a fetcher (`fetch`), a sink (`sink`), and the
//! `export` function that runs one after the other.

pub mod errors;
pub mod export;
pub mod fetch;
pub mod settings;
pub mod sink;
pub mod types;

pub use errors::{ConfigError, ExportError, FetchError, WriteError};
pub use export::export;
pub use fetch::SheetFetcher;
pub use settings::Settings;
pub use sink::{CsvSink, TableSink};
pub use types::{Credential, SourceLocator, Table, WriteOutcome};
