//! Structural model of a MySQL table.
//!
//! These types are snapshots: a provider fills them in once (from the live
//! catalog or from a declarative JSON source) and the differs only read
//! them. Every type renders its own DDL fragments.

mod column;
mod index;
mod partition;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::quote;

pub use column::{charset_of, Column, ColumnKey};
pub use index::{group_by_key_name, sorted_for_definition, Index, IndexMember, PRIMARY_KEY_NAME};
pub use partition::{Partition, PartitionMethod, Partitioning};

/// A table snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Storage engine.
    pub engine: String,
    /// Default collation; the table character set is its prefix.
    pub collation: String,
    /// Columns.
    pub columns: Vec<Column>,
    /// Indices. Entries sharing a key name form one logical index.
    #[serde(default)]
    pub indices: Vec<Index>,
    /// Partitioning, if any.
    #[serde(default)]
    pub partitioning: Option<Partitioning>,
    /// Schema (database) the table was read from.
    #[serde(default)]
    pub schema: String,
    /// Estimated row count.
    #[serde(default)]
    pub table_rows: Option<u64>,
    /// Next auto-increment value.
    #[serde(default)]
    pub auto_increment: Option<u64>,
    /// Catalog create options, e.g. `partitioned`.
    #[serde(default)]
    pub create_options: String,
}

impl Table {
    /// Creates an empty InnoDB table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine: "InnoDB".to_string(),
            collation: String::new(),
            columns: Vec::new(),
            indices: Vec::new(),
            partitioning: None,
            schema: String::new(),
            table_rows: None,
            auto_increment: None,
            create_options: String::new(),
        }
    }

    /// Sets the storage engine.
    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Sets the default collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = collation.into();
        self
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    /// Sets the partitioning.
    #[must_use]
    pub fn partitioning(mut self, partitioning: Partitioning) -> Self {
        self.partitioning = Some(partitioning);
        self
    }

    /// Returns the table character set, derived from the collation.
    #[must_use]
    pub fn charset(&self) -> &str {
        charset_of(&self.collation)
    }

    /// Returns the collation, or `None` when it is unset.
    #[must_use]
    pub fn collation_ref(&self) -> Option<&str> {
        if self.collation.is_empty() {
            None
        } else {
            Some(&self.collation)
        }
    }

    /// Returns the columns ordered by ordinal position.
    #[must_use]
    pub fn sorted_columns(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.iter().collect();
        columns.sort_by_key(|c| c.ordinal_position);
        columns
    }

    /// Returns the columns keyed by name.
    #[must_use]
    pub fn columns_by_name(&self) -> HashMap<&str, &Column> {
        self.columns.iter().map(|c| (c.name.as_str(), c)).collect()
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Compares everything that shapes the table's DDL.
    ///
    /// Row estimates, auto-increment counters, create options, schema
    /// qualifiers and index cardinality are ignored. Columns are compared
    /// with [`Column::differs_from`] plus their collation and position.
    #[must_use]
    pub fn same_structure(&self, other: &Self) -> bool {
        if self.name != other.name
            || self.engine != other.engine
            || self.collation != other.collation
            || self.partitioning != other.partitioning
            || self.columns.len() != other.columns.len()
        {
            return false;
        }

        let columns_match = self
            .sorted_columns()
            .iter()
            .zip(other.sorted_columns())
            .all(|(a, b)| {
                a.ordinal_position == b.ordinal_position
                    && !a.differs_from(b)
                    && !a.charset_differs_from(b)
            });
        if !columns_match {
            return false;
        }

        let ours = group_by_key_name(&self.indices);
        let theirs = group_by_key_name(&other.indices);
        ours.len() == theirs.len()
            && ours.iter().all(|(name, index)| {
                theirs
                    .get(name)
                    .is_some_and(|other| index.same_composition(other))
            })
    }

    /// Returns the quoted table name.
    #[must_use]
    pub fn quoted_name(&self) -> String {
        quote::ident(&self.name)
    }

    /// Renders `create table`.
    #[must_use]
    pub fn to_create_sql(&self) -> String {
        let table_collation = self.collation_ref();
        let mut definitions: Vec<String> = self
            .sorted_columns()
            .into_iter()
            .map(|c| c.to_sql(table_collation))
            .collect();
        definitions.extend(sorted_for_definition(&self.indices).iter().map(Index::to_sql));

        let mut sql = format!(
            "create table if not exists {} (\n\t{}\n) engine={}",
            self.quoted_name(),
            definitions.join(",\n\t"),
            self.engine
        );
        if let Some(collation) = table_collation {
            sql.push_str(&format!(
                " default charset={} collate={collation}",
                self.charset()
            ));
        }
        let partition = self
            .partitioning
            .as_ref()
            .map(Partitioning::to_sql)
            .unwrap_or_default();
        if !partition.is_empty() {
            sql.push('\n');
            sql.push_str(&partition);
        }
        sql
    }

    /// Renders `drop table`.
    #[must_use]
    pub fn to_drop_sql(&self) -> String {
        format!("drop table if exists {}", self.quoted_name())
    }

    /// Renders `alter table` with the given clauses, or `None` when there
    /// are no clauses.
    #[must_use]
    pub fn to_alter_sql(&self, clauses: &[String]) -> Option<String> {
        if clauses.is_empty() {
            return None;
        }
        Some(format!(
            "alter table {}\n\t{}",
            self.quoted_name(),
            clauses.join(",\n\t")
        ))
    }

    /// Renders the table-level character set conversion.
    #[must_use]
    pub fn to_convert_charset_sql(&self) -> String {
        let mut sql = format!(
            "alter table {} convert to character set {}",
            self.quoted_name(),
            self.charset()
        );
        if !self.collation.is_empty() {
            sql.push_str(" collate ");
            sql.push_str(&self.collation);
        }
        sql
    }

    /// Renders a change of the default collation. Existing columns keep
    /// theirs.
    #[must_use]
    pub fn to_default_collation_sql(&self) -> String {
        format!(
            "alter table {} default collate {}",
            self.quoted_name(),
            self.collation
        )
    }

    /// Renders the per-column character set change.
    #[must_use]
    pub fn to_modify_charset_sql(&self, column: &Column) -> String {
        format!(
            "alter table {} {}",
            self.quoted_name(),
            column.to_modify_charset_sql()
        )
    }
}
