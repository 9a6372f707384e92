//! Table partitioning.
//!
//! Only `LINEAR KEY`, `LINEAR HASH` and `RANGE COLUMNS` are rendered. Any
//! other method is kept in the snapshot so that it still takes part in
//! structural comparison, but renders to an empty clause.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::quote;

/// Partitioning method as reported by `information_schema.partitions`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PartitionMethod {
    /// `LINEAR KEY`
    LinearKey,
    /// `LINEAR HASH`
    LinearHash,
    /// `RANGE COLUMNS`
    RangeColumns,
    /// Any method that is not rendered.
    Other(String),
}

impl From<String> for PartitionMethod {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "LINEAR KEY" => Self::LinearKey,
            "LINEAR HASH" => Self::LinearHash,
            "RANGE COLUMNS" => Self::RangeColumns,
            _ => Self::Other(value),
        }
    }
}

impl From<PartitionMethod> for String {
    fn from(value: PartitionMethod) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PartitionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinearKey => f.write_str("LINEAR KEY"),
            Self::LinearHash => f.write_str("LINEAR HASH"),
            Self::RangeColumns => f.write_str("RANGE COLUMNS"),
            Self::Other(method) => f.write_str(method),
        }
    }
}

/// A single partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Partition name.
    pub name: String,
    /// Upper bound for range partitions (`PARTITION_DESCRIPTION`).
    #[serde(default)]
    pub description: Option<String>,
}

impl Partition {
    /// Creates a partition without an upper bound.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Creates a range partition bounded by `upper`.
    #[must_use]
    pub fn less_than(name: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(upper.into()),
        }
    }
}

/// Partitioning of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitioning {
    /// Partitioning method.
    pub method: PartitionMethod,
    /// Partitioning expression or column list.
    pub expression: String,
    /// Partitions in ordinal order.
    pub partitions: Vec<Partition>,
}

impl Partitioning {
    /// Renders the `partition by` clause, or an empty string for
    /// unsupported methods and empty partition lists.
    #[must_use]
    pub fn to_sql(&self) -> String {
        if self.partitions.is_empty() {
            return String::new();
        }
        match self.method {
            PartitionMethod::LinearKey => format!(
                "partition by linear key ({}) partitions {}",
                self.expression,
                self.partitions.len()
            ),
            PartitionMethod::LinearHash => format!(
                "partition by linear hash ({}) partitions {}",
                self.expression,
                self.partitions.len()
            ),
            PartitionMethod::RangeColumns => {
                let parts = self
                    .partitions
                    .iter()
                    .map(|p| {
                        format!(
                            "\tpartition {} values less than ({})",
                            quote::ident(&p.name),
                            p.description.as_deref().unwrap_or("MAXVALUE")
                        )
                    })
                    .collect::<Vec<_>>();
                format!(
                    "partition by range columns ({}) (\n{}\n)",
                    self.expression,
                    parts.join(",\n")
                )
            }
            PartitionMethod::Other(_) => String::new(),
        }
    }
}
