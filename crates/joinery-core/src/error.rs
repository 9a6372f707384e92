//! Error types for the differs.

/// Errors that can occur while diffing two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Neither an old nor a new snapshot was supplied.
    #[error("Both the old and the new snapshot are missing")]
    NilInput,

    /// The two table snapshots describe different tables.
    #[error("Table name mismatch: old is '{old}', new is '{new}'")]
    NameMismatch {
        /// Name of the old table.
        old: String,
        /// Name of the new table.
        new: String,
    },

    /// The comparison column is not part of a chunk.
    #[error("Column '{column}' not found in table '{table}'")]
    Lookup {
        /// Table the chunk belongs to.
        table: String,
        /// The missing column.
        column: String,
    },

    /// A row of a chunk is too short to carry the comparison column.
    #[error("Row {row} of table '{table}' has no value for column '{column}'")]
    MissingKey {
        /// Table the chunk belongs to.
        table: String,
        /// The comparison column.
        column: String,
        /// Zero-based row number.
        row: usize,
    },

    /// Two rows of one chunk share a comparison-column value.
    #[error("Duplicate value {key} for column '{column}' in table '{table}'")]
    DuplicateKey {
        /// Table the chunk belongs to.
        table: String,
        /// The comparison column.
        column: String,
        /// The rendered duplicate value.
        key: String,
    },
}

/// Result type for diff operations.
pub type Result<T> = std::result::Result<T, DiffError>;
