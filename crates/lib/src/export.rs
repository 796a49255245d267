use crate::errors::ExportError;
use crate::fetch::SheetFetcher;
use crate::sink::TableSink;
use crate::types::{Credential, SourceLocator, WriteOutcome};
use std::path::Path;
use tracing::error;

/// Fetches one worksheet and writes it to `destination`.
///
/// The destination is only touched once the fetch has succeeded; a fetch
/// failure is logged and returned without writing anything.
pub async fn export<S: TableSink + ?Sized>(
    fetcher: &SheetFetcher,
    sink: &S,
    locator: &SourceLocator,
    credential: &Credential,
    destination: &Path,
) -> Result<WriteOutcome, ExportError> {
    let table = match fetcher.fetch(locator, credential).await {
        Ok(table) => table,
        Err(e) => {
            error!("Failed to retrieve data from sheet '{locator}': {e}");
            return Err(e.into());
        }
    };

    sink.write(&table, destination).map_err(|e| {
        error!("Error writing to {}: {e}", destination.display());
        ExportError::from(e)
    })
}
