//! Error types for the joinery tool.

use std::path::PathBuf;

use joinery_core::error::DiffError;

/// Errors that can occur while loading, introspecting or applying changes.
#[derive(Debug, thiserror::Error)]
pub enum JoineryError {
    /// A differ rejected its input.
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// Database error while introspecting or executing.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A statement failed to execute.
    #[error("Failed to execute `{statement}`: {source}")]
    Execute {
        /// The failing statement.
        statement: String,
        /// The driver error.
        source: sqlx::Error,
    },

    /// IO error (reading sources, writing exports).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid table filter.
    #[error("Invalid table pattern: {0}")]
    Regex(#[from] regex::Error),

    /// A source file is well-formed but unusable.
    #[error("Invalid source file '{path}': {message}")]
    InvalidSource {
        /// Offending file.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// No source file with the expected extension was found.
    #[error("No *.{extension} files found in {dir}")]
    NoSourceFiles {
        /// Directory that was searched.
        dir: PathBuf,
        /// Expected extension, without the dot.
        extension: String,
    },

    /// A seed file names a table the schema does not have.
    #[error("Table '{0}' does not exist")]
    UnknownTable(String),

    /// A required setting is missing.
    #[error("Missing required setting: {0}")]
    MissingConfig(&'static str),

    /// A worker task panicked or was cancelled.
    #[error("Worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// An error scoped to one table.
    #[error("{table}: {source}")]
    Table {
        /// Table being processed.
        table: String,
        /// Underlying error.
        source: Box<JoineryError>,
    },

    /// Multiple errors occurred.
    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<JoineryError>),
}

impl JoineryError {
    /// Attaches the table being processed.
    #[must_use]
    pub fn in_table(self, table: impl Into<String>) -> Self {
        Self::Table {
            table: table.into(),
            source: Box::new(self),
        }
    }

    /// Collapses a list of errors: one error is returned as is, several are
    /// wrapped in [`JoineryError::Multiple`].
    #[must_use]
    pub fn aggregate(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

/// Result type for joinery operations.
pub type Result<T> = std::result::Result<T, JoineryError>;
