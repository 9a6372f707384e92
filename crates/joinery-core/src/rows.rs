//! Row model: chunks of seed rows and their DML rendering.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use crate::error::{DiffError, Result};
use crate::quote;

/// Rows per row-bearing statement.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Format used for date-time literals.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell value, already typed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Date and time.
    DateTime(NaiveDateTime),
}

impl Value {
    /// Renders the canonical SQL literal.
    ///
    /// Row equality is defined on this rendering, so `Int(10)` and
    /// `Float(10.0)` are the same value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Float(f) if f.is_finite() => f.to_string(),
            Self::Null | Self::Float(_) => "null".to_string(),
            Self::Text(s) => quote::string(s),
            Self::DateTime(t) => quote::string(&t.format(TIME_FORMAT).to_string()),
        }
    }

    /// Returns the cell text the value was read from, or `None` for NULL.
    #[must_use]
    pub fn raw_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Int(n) => Some(n.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::DateTime(t) => Some(t.format(TIME_FORMAT).to_string()),
        }
    }

    /// Returns whether the value is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Types a textual cell according to a column's base data type.
///
/// Live rows and seed files both go through here, so equal cells render
/// equal literals. `None` is NULL. Values that do not parse as their
/// declared type are kept as text.
#[must_use]
pub fn retype(data_type: &str, raw: Option<String>) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };
    match data_type {
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
            if let Ok(n) = raw.parse::<i64>() {
                Value::Int(n)
            } else if let Ok(f) = raw.parse::<f64>() {
                Value::Float(f)
            } else {
                Value::Text(raw)
            }
        }
        "decimal" | "numeric" | "float" | "double" | "real" => match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::Text(raw),
        },
        "datetime" | "timestamp" => match NaiveDateTime::parse_from_str(&raw, TIME_FORMAT) {
            Ok(t) => Value::DateTime(t),
            Err(_) => Value::Text(raw),
        },
        _ => Value::Text(raw),
    }
}

/// One row of positional values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Seed {
    /// Values in the chunk's column order.
    pub values: Vec<Value>,
}

impl Seed {
    /// Creates a row.
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Renders the row as a parenthesised value list.
    #[must_use]
    pub fn to_value_sql(&self) -> String {
        let values: Vec<String> = self.values.iter().map(Value::to_sql).collect();
        format!("({})", values.join(","))
    }

    /// Returns the rendered value at `index`, if present.
    #[must_use]
    pub fn rendered(&self, index: usize) -> Option<String> {
        self.values.get(index).map(Value::to_sql)
    }
}

/// Builds a [`Seed`] from heterogeneous values.
#[macro_export]
macro_rules! seed {
    ($($value:expr),* $(,)?) => {
        $crate::rows::Seed::new(vec![$($crate::rows::Value::from($value)),*])
    };
}

/// A table's full row set plus its column ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Table name.
    pub table: String,
    /// Column names, in the order of each seed's values.
    pub columns: Vec<String>,
    /// Rows.
    pub seeds: Vec<Seed>,
}

impl Chunk {
    /// Creates a chunk.
    #[must_use]
    pub fn new(table: impl Into<String>, columns: &[&str], seeds: Vec<Seed>) -> Self {
        Self {
            table: table.into(),
            columns: columns.iter().map(ToString::to_string).collect(),
            seeds,
        }
    }

    /// Returns the position of `column` within the column list.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DiffError::Lookup {
                table: self.table.clone(),
                column: column.to_string(),
            })
    }

    /// Keys every row by the rendered value of `column`, in row order.
    ///
    /// Rows too short to hold the key and rows sharing a key are rejected.
    pub fn keyed_rows(&self, column: &str) -> Result<KeyedRows<'_>> {
        let position = self.column_index(column)?;
        let mut rows = Vec::with_capacity(self.seeds.len());
        let mut positions = HashMap::with_capacity(self.seeds.len());
        for (row, seed) in self.seeds.iter().enumerate() {
            let Some(key) = seed.rendered(position) else {
                return Err(DiffError::MissingKey {
                    table: self.table.clone(),
                    column: column.to_string(),
                    row,
                });
            };
            if positions.insert(key.clone(), rows.len()).is_some() {
                return Err(DiffError::DuplicateKey {
                    table: self.table.clone(),
                    column: column.to_string(),
                    key,
                });
            }
            rows.push((key, seed));
        }
        Ok(KeyedRows { rows, positions })
    }

    /// Returns the quoted table name.
    #[must_use]
    pub fn quoted_name(&self) -> String {
        quote::ident(&self.table)
    }

    /// Renders `truncate table`.
    #[must_use]
    pub fn to_truncate_sql(&self) -> String {
        format!("truncate table {}", self.quoted_name())
    }

    /// Renders batched `insert` statements for every row.
    #[must_use]
    pub fn to_insert_sql(&self) -> Vec<String> {
        self.insert_sql_for(&self.seeds.iter().collect::<Vec<_>>(), DEFAULT_BATCH_SIZE)
    }

    /// Renders batched `replace` statements for every row.
    #[must_use]
    pub fn to_replace_sql(&self) -> Vec<String> {
        self.replace_sql_for(&self.seeds.iter().collect::<Vec<_>>(), DEFAULT_BATCH_SIZE)
    }

    /// Renders batched `delete` statements for every row, keyed on `column`.
    pub fn to_delete_sql(&self, column: &str) -> Result<Vec<String>> {
        let position = self.column_index(column)?;
        let rows: Vec<&Seed> = self.seeds.iter().collect();
        Ok(self.delete_sql_for(position, &rows, DEFAULT_BATCH_SIZE))
    }

    /// Renders batched `insert` statements for `rows`.
    #[must_use]
    pub fn insert_sql_for(&self, rows: &[&Seed], batch_size: usize) -> Vec<String> {
        self.values_sql_for("insert into", rows, batch_size)
    }

    /// Renders batched `replace` statements for `rows`.
    #[must_use]
    pub fn replace_sql_for(&self, rows: &[&Seed], batch_size: usize) -> Vec<String> {
        self.values_sql_for("replace into", rows, batch_size)
    }

    /// Renders batched `delete` statements for `rows`, keyed on the column
    /// at `position`.
    #[must_use]
    pub fn delete_sql_for(&self, position: usize, rows: &[&Seed], batch_size: usize) -> Vec<String> {
        let Some(column) = self.columns.get(position) else {
            return Vec::new();
        };
        let column = quote::ident(column);
        rows.chunks(batch_size.max(1))
            .map(|batch| {
                let keys: Vec<String> = batch
                    .iter()
                    .map(|seed| seed.rendered(position).unwrap_or_else(|| "null".to_string()))
                    .collect();
                format!(
                    "delete from {} where {column} in (\n{}\n)",
                    self.quoted_name(),
                    keys.join(",\n")
                )
            })
            .collect()
    }

    fn values_sql_for(&self, verb: &str, rows: &[&Seed], batch_size: usize) -> Vec<String> {
        let columns = quote::ident_list(&self.columns);
        rows.chunks(batch_size.max(1))
            .map(|batch| {
                let values: Vec<String> = batch.iter().map(|seed| seed.to_value_sql()).collect();
                format!(
                    "{verb} {}({columns})\nvalues\n{}",
                    self.quoted_name(),
                    values.join(",\n")
                )
            })
            .collect()
    }
}

/// Rows of a chunk keyed by their comparison-column rendering.
#[derive(Debug)]
pub struct KeyedRows<'a> {
    rows: Vec<(String, &'a Seed)>,
    positions: HashMap<String, usize>,
}

impl<'a> KeyedRows<'a> {
    /// Iterates rows in chunk order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &'a Seed)> + '_ {
        self.rows.iter().map(|(key, seed)| (key.as_str(), *seed))
    }

    /// Looks a row up by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Seed> {
        self.positions.get(key).map(|&i| self.rows[i].1)
    }

    /// Returns whether a row with `key` exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Number of keyed rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether no row was keyed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
