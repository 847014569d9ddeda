use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the subscription dashboard.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// One or more required columns are absent after header normalisation.
    #[error("Missing required column(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A cell could not be converted into its typed field.
    #[error("Row {row}, column {column}: cannot parse {value:?} ({reason})")]
    Parse {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    /// The filter criteria are malformed (e.g. `min_price > max_price`).
    #[error("Invalid filter criteria: {0}")]
    InvalidCriteria(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The expected data file or directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No CSV files were found under the given directory.
    #[error("No CSV files found in {0}")]
    NoDataFiles(PathBuf),

    /// The CSV reader or writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// Build a [`DashboardError::Parse`] for the given cell.
    pub fn parse(
        row: usize,
        column: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Parse {
            row,
            column: column.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashboardError>;
