//! Column definitions.

use serde::{Deserialize, Serialize};

use crate::quote;

/// Key class reported by the catalog for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColumnKey {
    /// Not part of any index.
    #[default]
    #[serde(rename = "")]
    None,
    /// Part of the primary key.
    #[serde(rename = "PRI")]
    Primary,
    /// First column of a unique index.
    #[serde(rename = "UNI")]
    Unique,
    /// First column of a non-unique index.
    #[serde(rename = "MUL")]
    Multiple,
}

impl ColumnKey {
    /// Parses the `COLUMN_KEY` catalog value.
    #[must_use]
    pub fn from_catalog(value: &str) -> Self {
        match value {
            "PRI" => Self::Primary,
            "UNI" => Self::Unique,
            "MUL" => Self::Multiple,
            _ => Self::None,
        }
    }
}

/// A table column as described by `information_schema.columns`.
///
/// Only the fields that change the column's DDL take part in change
/// detection, see [`Column::differs_from`]. The catalog, schema and
/// privileges fields, the key class and the ordinal position are carried
/// for completeness but never compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// 1-based position within the table.
    pub ordinal_position: u32,
    /// Full declared type, e.g. `int(11) unsigned`.
    pub column_type: String,
    /// Base type name, e.g. `int`. Derived from `column_type` when empty.
    #[serde(default)]
    pub data_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default value as reported by the catalog (unquoted).
    #[serde(default)]
    pub default: Option<String>,
    /// Character set for textual columns.
    #[serde(default)]
    pub character_set: Option<String>,
    /// Collation for textual columns.
    #[serde(default)]
    pub collation: Option<String>,
    /// Key class.
    #[serde(default)]
    pub key: ColumnKey,
    /// Extra modifiers such as `auto_increment`.
    #[serde(default)]
    pub extra: Option<String>,
    /// Column comment.
    #[serde(default)]
    pub comment: String,
    /// Catalog name (always `def` on MySQL).
    #[serde(default)]
    pub catalog: String,
    /// Schema (database) the column was read from.
    #[serde(default)]
    pub schema: String,
    /// Privileges of the reading user.
    #[serde(default)]
    pub privileges: String,
}

impl Column {
    /// Creates a nullable column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, ordinal_position: u32, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal_position,
            column_type: column_type.into(),
            data_type: String::new(),
            nullable: true,
            default: None,
            character_set: None,
            collation: None,
            key: ColumnKey::None,
            extra: None,
            comment: String::new(),
            catalog: String::new(),
            schema: String::new(),
            privileges: String::new(),
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the collation; the character set is taken from its prefix.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        let collation = collation.into();
        self.character_set = Some(charset_of(&collation).to_string());
        self.collation = Some(collation);
        self
    }

    /// Sets the key class.
    #[must_use]
    pub fn key(mut self, key: ColumnKey) -> Self {
        self.key = key;
        self
    }

    /// Sets the extra modifiers.
    #[must_use]
    pub fn extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Returns the base type name.
    #[must_use]
    pub fn base_type(&self) -> String {
        if !self.data_type.is_empty() {
            return self.data_type.to_ascii_lowercase();
        }
        self.column_type
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// Returns the character set, falling back to the collation prefix.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.character_set
            .as_deref()
            .or_else(|| self.collation.as_deref().map(charset_of))
    }

    /// Compares the attributes that affect the column's DDL.
    ///
    /// Catalog, schema, privileges, key class and ordinal position are
    /// recomputed by the server. Character set and collation are compared
    /// separately by [`Column::charset_differs_from`].
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.name != other.name
            || self.column_type != other.column_type
            || self.base_type() != other.base_type()
            || self.nullable != other.nullable
            || self.default != other.default
            || normalize_extra(self.extra.as_deref()) != normalize_extra(other.extra.as_deref())
            || self.comment != other.comment
    }

    /// Returns whether the collation changed.
    #[must_use]
    pub fn charset_differs_from(&self, other: &Self) -> bool {
        self.collation != other.collation
    }

    /// Renders the column declaration.
    ///
    /// A `character set ... collate ...` clause is emitted when the column
    /// has a collation other than `table_collation`. Pass `None` to always
    /// emit it.
    #[must_use]
    pub fn to_sql(&self, table_collation: Option<&str>) -> String {
        let mut parts = vec![quote::ident(&self.name), self.column_type.clone()];

        if let Some(collation) = self.collation.as_deref() {
            if table_collation != Some(collation) {
                let charset = self.charset().unwrap_or_else(|| charset_of(collation));
                parts.push(format!("character set {charset} collate {collation}"));
            }
        }

        if !self.nullable {
            parts.push("not null".to_string());
        }

        if self.default.is_some() {
            parts.push(format!("default {}", self.format_default()));
        }

        let extra = normalize_extra(self.extra.as_deref());
        if !extra.is_empty() {
            parts.push(extra);
        }

        if !self.comment.is_empty() {
            parts.push(format!("comment {}", quote::string(&self.comment)));
        }

        parts.join(" ")
    }

    /// Renders the default literal, quoting it for textual and temporal types.
    #[must_use]
    pub fn format_default(&self) -> String {
        let Some(value) = self.default.as_deref() else {
            return String::new();
        };
        match self.base_type().as_str() {
            "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" | "tinyblob"
            | "blob" | "mediumblob" | "longblob" | "binary" | "varbinary" | "enum" | "set"
            | "date" | "time" => quote::string(value),
            "datetime" | "timestamp" if !is_current_timestamp(value) => quote::string(value),
            _ => value.to_string(),
        }
    }

    /// Returns the placement directive for this column within `all`.
    #[must_use]
    pub fn position_in(&self, all: &[Self]) -> String {
        let previous = self.ordinal_position.checked_sub(1).and_then(|position| {
            all.iter()
                .find(|column| column.ordinal_position == position)
        });
        match previous {
            Some(column) => format!("after {}", quote::ident(&column.name)),
            None => "first".to_string(),
        }
    }

    /// Renders an `add` clause.
    #[must_use]
    pub fn to_add_sql(&self, all: &[Self], table_collation: Option<&str>) -> String {
        format!("add {} {}", self.to_sql(table_collation), self.position_in(all))
    }

    /// Renders a `drop` clause.
    #[must_use]
    pub fn to_drop_sql(&self) -> String {
        format!("drop {}", quote::ident(&self.name))
    }

    /// Renders a `modify` clause.
    #[must_use]
    pub fn to_modify_sql(&self, all: &[Self], table_collation: Option<&str>) -> String {
        format!("modify {} {}", self.to_sql(table_collation), self.position_in(all))
    }

    /// Renders a `modify` clause that always carries the character set.
    #[must_use]
    pub fn to_modify_charset_sql(&self) -> String {
        format!("modify {}", self.to_sql(None))
    }
}

/// Returns the character set encoded in a collation name.
#[must_use]
pub fn charset_of(collation: &str) -> &str {
    collation.split('_').next().unwrap_or_default()
}

fn is_current_timestamp(value: &str) -> bool {
    let upper = value.to_ascii_uppercase();
    upper.starts_with("CURRENT_TIMESTAMP") || upper.starts_with("NOW(")
}

/// `DEFAULT_GENERATED` is catalog metadata, not DDL.
fn normalize_extra(extra: Option<&str>) -> String {
    extra
        .unwrap_or_default()
        .split_whitespace()
        .filter(|token| !token.eq_ignore_ascii_case("DEFAULT_GENERATED"))
        .collect::<Vec<_>>()
        .join(" ")
}
