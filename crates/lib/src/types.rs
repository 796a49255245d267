use std::fmt;
use std::path::PathBuf;

/// Rows of string cells as returned by a fetch.
///
/// Rows may have different lengths. A `Table` is never mutated after the
/// fetcher hands it out, so only read accessors are exposed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }
}

impl From<Vec<Vec<String>>> for Table {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self::new(rows)
    }
}

/// Identifies which spreadsheet and which worksheet to read.
///
/// With a service account, `sheet` is a worksheet title or a zero-based index.
/// With an API key it is passed through as an A1 range (`Sheet1`,
/// `Sheet1!A1:C10`), so a bare number is not treated as an index. An empty
/// `sheet` selects the first worksheet in both modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    pub spreadsheet_id: String,
    pub sheet: String,
}

impl SourceLocator {
    pub fn new(spreadsheet_id: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet: sheet.into(),
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sheet.is_empty() {
            write!(f, "{}", self.spreadsheet_id)
        } else {
            write!(f, "{}/{}", self.spreadsheet_id, self.sheet)
        }
    }
}

/// How a fetch authenticates against the Sheets API.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Read-only access to a publicly shared spreadsheet.
    ApiKey(String),
    /// Path to a service account JSON key for private spreadsheets.
    ServiceAccount(PathBuf),
}

// The API key is a secret and must not end up in logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.debug_tuple("ApiKey").field(&"<redacted>").finish(),
            Credential::ServiceAccount(path) => {
                f.debug_tuple("ServiceAccount").field(path).finish()
            }
        }
    }
}

/// What a successful write produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The destination now holds `rows` records.
    Written { rows: usize },
    /// The table had no rows; the destination exists but is empty.
    Empty,
}

impl WriteOutcome {
    pub fn rows(&self) -> usize {
        match self {
            WriteOutcome::Written { rows } => *rows,
            WriteOutcome::Empty => 0,
        }
    }
}
