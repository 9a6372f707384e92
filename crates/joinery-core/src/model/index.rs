//! Index definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::quote;

/// Key name MySQL reserves for the primary key.
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

/// One column of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMember {
    /// Indexed column.
    pub column: String,
    /// Prefix length for partially indexed columns.
    #[serde(default)]
    pub sub_part: Option<u32>,
    /// Estimated number of distinct values. Volatile.
    #[serde(default)]
    pub cardinality: Option<u64>,
}

impl IndexMember {
    /// Creates a member covering the whole column.
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            sub_part: None,
            cardinality: None,
        }
    }

    /// Creates a member covering a prefix of the column.
    #[must_use]
    pub fn prefix(column: impl Into<String>, length: u32) -> Self {
        Self {
            sub_part: Some(length),
            ..Self::new(column)
        }
    }

    fn to_sql(&self) -> String {
        match self.sub_part {
            Some(length) => format!("{}({length})", quote::ident(&self.column)),
            None => quote::ident(&self.column),
        }
    }
}

/// A logical index: every catalog row sharing one key name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Key name; `PRIMARY` for the primary key.
    pub name: String,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Indexed columns in key order.
    pub members: Vec<IndexMember>,
    /// Index comment.
    #[serde(default)]
    pub comment: String,
}

impl Index {
    /// Creates a non-unique index over the given columns.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            unique: false,
            members: columns.iter().map(|c| IndexMember::new(*c)).collect(),
            comment: String::new(),
        }
    }

    /// Creates the primary key over the given columns.
    #[must_use]
    pub fn primary(columns: &[&str]) -> Self {
        Self::new(PRIMARY_KEY_NAME, columns).unique()
    }

    /// Marks the index as unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Returns whether this is the primary key.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_KEY_NAME
    }

    /// Returns a copy with every member's cardinality reset.
    #[must_use]
    pub fn without_cardinality(&self) -> Self {
        let mut index = self.clone();
        for member in &mut index.members {
            member.cardinality = None;
        }
        index
    }

    /// Compares name, uniqueness, members and comment, ignoring cardinality.
    #[must_use]
    pub fn same_composition(&self, other: &Self) -> bool {
        self.without_cardinality() == other.without_cardinality()
    }

    /// Renders the index as a table-definition fragment.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let members = self
            .members
            .iter()
            .map(IndexMember::to_sql)
            .collect::<Vec<_>>()
            .join(",");
        let mut sql = if self.is_primary() {
            format!("primary key ({members})")
        } else if self.unique {
            format!("unique key {} ({members})", quote::ident(&self.name))
        } else {
            format!("key {} ({members})", quote::ident(&self.name))
        };
        if !self.comment.is_empty() {
            sql.push_str(" comment ");
            sql.push_str(&quote::string(&self.comment));
        }
        sql
    }

    /// Renders an `add` clause.
    #[must_use]
    pub fn to_add_sql(&self) -> String {
        format!("add {}", self.to_sql())
    }

    /// Renders a `drop` clause.
    #[must_use]
    pub fn to_drop_sql(&self) -> String {
        if self.is_primary() {
            "drop primary key".to_string()
        } else {
            format!("drop key {}", quote::ident(&self.name))
        }
    }

    /// Rank used when rendering a table: primary, unique, then plain keys.
    fn rank(&self) -> u8 {
        if self.is_primary() {
            0
        } else if self.unique {
            1
        } else {
            2
        }
    }
}

/// Groups indices by key name, merging entries that share a name.
///
/// Members of merged entries are appended in input order. The map iterates
/// in ascending key-name order.
#[must_use]
pub fn group_by_key_name(indices: &[Index]) -> BTreeMap<String, Index> {
    let mut grouped: BTreeMap<String, Index> = BTreeMap::new();
    for index in indices {
        match grouped.get_mut(&index.name) {
            Some(existing) => existing.members.extend(index.members.iter().cloned()),
            None => {
                grouped.insert(index.name.clone(), index.clone());
            }
        }
    }
    grouped
}

/// Returns the logical indices ordered primary, unique, plain; ties by name.
#[must_use]
pub fn sorted_for_definition(indices: &[Index]) -> Vec<Index> {
    let mut sorted: Vec<Index> = group_by_key_name(indices).into_values().collect();
    sorted.sort_by(|a, b| {
        a.rank()
            .cmp(&b.rank())
            .then_with(|| a.name.cmp(&b.name))
    });
    sorted
}
