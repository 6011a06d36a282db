//! Error types shared by every pipeline stage.

use rust_xlsxwriter::XlsxError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    /// Input missing or unreadable, or an output that cannot be created.
    #[error("Cannot access {}: {source}", path.display())]
    DataAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Ragged rows, missing columns, non-numeric ratings, unparseable dates.
    #[error("Malformed input: {0}")]
    Format(String),
    #[error("Nothing to {0}: input is empty")]
    EmptyInput(&'static str),
    #[error("Chart rendering failed: {0}")]
    Render(String),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(XlsxError),
}

impl ReportError {
    pub fn data_access(path: &Path, source: std::io::Error) -> Self {
        Self::DataAccess {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Route writer IO failures to `DataAccess` so a locked or read-only
    /// target reads the same as an unreadable input.
    pub fn from_xlsx(path: &Path, err: XlsxError) -> Self {
        match err {
            XlsxError::IoError(source) => Self::data_access(path, source),
            other => Self::Spreadsheet(other),
        }
    }
}

impl From<polars::prelude::PolarsError> for ReportError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::Format(err.to_string())
    }
}
