//! # Table Sinks
//!
//! Persists a fetched `Table` to the file system. `CsvSink` writes standard
//! CSV through a temporary file in the destination directory, so the
//! destination is either fully replaced or left as it was.

use crate::errors::WriteError;
use crate::types::{Table, WriteOutcome};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info};

/// Record terminator matching the platform's newline convention.
#[cfg(windows)]
const PLATFORM_TERMINATOR: Terminator = Terminator::CRLF;
#[cfg(not(windows))]
const PLATFORM_TERMINATOR: Terminator = Terminator::Any(b'\n');

/// A destination for fetched tables.
pub trait TableSink {
    /// Writes `table` to `destination`, replacing any previous content.
    fn write(&self, table: &Table, destination: &Path) -> Result<WriteOutcome, WriteError>;
}

/// Writes tables as comma separated values, quoting only where needed.
#[derive(Debug, Clone, Copy)]
pub struct CsvSink {
    delimiter: u8,
    terminator: Terminator,
}

impl Default for CsvSink {
    fn default() -> Self {
        Self {
            delimiter: b',',
            terminator: PLATFORM_TERMINATOR,
        }
    }
}

impl CsvSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the record terminator, e.g. to force `\r\n` on every platform.
    pub fn with_terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }

    fn serialize<W: Write>(&self, table: &Table, out: W) -> csv::Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(self.terminator)
            .quote_style(QuoteStyle::Necessary)
            .flexible(true)
            .has_headers(false)
            .from_writer(out);
        for row in table.rows() {
            if row.is_empty() {
                // A record with no fields would otherwise be written as `""`.
                writer.flush()?;
                write_terminator(writer.get_mut(), self.terminator)?;
            } else {
                writer.write_record(row)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

fn write_terminator<W: Write>(out: &mut W, terminator: Terminator) -> std::io::Result<()> {
    match terminator {
        Terminator::CRLF => out.write_all(b"\r\n"),
        Terminator::Any(byte) => out.write_all(&[byte]),
        _ => out.write_all(b"\n"),
    }
}

impl TableSink for CsvSink {
    fn write(&self, table: &Table, destination: &Path) -> Result<WriteOutcome, WriteError> {
        let parent = ensure_parent_dir(destination)?;
        let write_failed = |source: std::io::Error| WriteError::FileWriteFailed {
            path: destination.to_path_buf(),
            source,
        };

        info!("Writing data to {}", destination.display());
        let mut staged = stage_in(&parent, destination).map_err(write_failed)?;
        self.serialize(table, staged.as_file_mut())
            .map_err(|e| write_failed(e.into()))?;
        staged.as_file().sync_all().map_err(write_failed)?;
        staged
            .persist(destination)
            .map_err(|e| write_failed(e.error))?;

        if table.is_empty() {
            info!("No data to write; created empty {}", destination.display());
            Ok(WriteOutcome::Empty)
        } else {
            info!(
                "Data successfully written to {} ({} rows)",
                destination.display(),
                table.len()
            );
            Ok(WriteOutcome::Written { rows: table.len() })
        }
    }
}

/// Opens the temporary file that later replaces `destination`.
///
/// The staged file takes the destination's current permissions, or the
/// umask-filtered default of a newly created file when there is none.
fn stage_in(parent: &Path, destination: &Path) -> std::io::Result<NamedTempFile> {
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let staged = builder.tempfile_in(parent)?;
    if let Ok(existing) = fs::metadata(destination) {
        if existing.is_file() {
            staged.as_file().set_permissions(existing.permissions())?;
        }
    }
    Ok(staged)
}

/// Creates the destination's parent directory if needed and returns it.
///
/// A bare file name has no parent segment and resolves to the current
/// directory, which is never created.
fn ensure_parent_dir(destination: &Path) -> Result<PathBuf, WriteError> {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            debug!("Ensuring directory {} exists", parent.display());
            fs::create_dir_all(parent).map_err(|source| {
                WriteError::DirectoryCreateFailed {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
            Ok(parent.to_path_buf())
        }
        _ => Ok(PathBuf::from(".")),
    }
}
