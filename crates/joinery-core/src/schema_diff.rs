//! Schema differ: turns two table snapshots into ordered DDL.
//!
//! The differ is a pure function. It never touches a connection and never
//! mutates its inputs; volatile catalog data is excluded by the named
//! comparators on the model types instead.
//!
//! When both snapshots are present, the output is:
//!
//! 1. a `convert to character set` statement if the table character set
//!    changed, or a `default collate` statement if only its collation did,
//! 2. one `modify ... character set ... collate ...` statement per column
//!    whose collation changed. A conversion rewrites every textual column,
//!    so columns keeping a collation of their own are restored as well,
//! 3. a single `alter table` whose clauses are, in this order: dropped
//!    indices, dropped columns, added columns, added or rebuilt indices,
//!    modified columns.
//!
//! Indices are dropped before the columns they cover; new columns exist
//! before indices that reference them are built.

use tracing::debug;

use crate::error::{DiffError, Result};
use crate::model::{group_by_key_name, Column, Table};

/// Diffs two table snapshots.
///
/// `old` is the current state and `new` the desired one. Either may be
/// absent, but not both.
///
/// # Example
///
/// ```
/// use joinery_core::model::{Column, Table};
/// use joinery_core::schema_diff::diff;
///
/// let table = Table::new("tags").column(Column::new("id", 1, "int(11)").not_null());
///
/// assert_eq!(diff(None, Some(&table)).unwrap(), vec![table.to_create_sql()]);
/// assert_eq!(diff(Some(&table), None).unwrap(), vec![table.to_drop_sql()]);
/// assert!(diff(Some(&table), Some(&table)).unwrap().is_empty());
/// ```
pub fn diff(old: Option<&Table>, new: Option<&Table>) -> Result<Vec<String>> {
    match (old, new) {
        (None, None) => Err(DiffError::NilInput),
        (None, Some(new)) => {
            debug!(table = %new.name, "Table will be created");
            Ok(vec![new.to_create_sql()])
        }
        (Some(old), None) => {
            debug!(table = %old.name, "Table will be dropped");
            Ok(vec![old.to_drop_sql()])
        }
        (Some(old), Some(new)) => {
            if old.name != new.name {
                return Err(DiffError::NameMismatch {
                    old: old.name.clone(),
                    new: new.name.clone(),
                });
            }
            if old.same_structure(new) {
                return Ok(Vec::new());
            }
            Ok(plan_alter(old, new).into_statements(new))
        }
    }
}

/// The alterations needed to turn one table into another, grouped by kind.
///
/// Each list is already in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterPlan {
    /// Whether the table character set changed.
    pub convert_charset: bool,
    /// Whether only the table's default collation changed.
    pub default_collation: bool,
    /// Columns whose collation must be set explicitly, as they appear in
    /// the new table.
    pub column_charsets: Vec<Column>,
    /// `drop key` clauses.
    pub drop_indices: Vec<String>,
    /// `drop` column clauses.
    pub drop_columns: Vec<String>,
    /// `add` column clauses.
    pub add_columns: Vec<String>,
    /// `add key` clauses, each optionally preceded by the drop of the key it
    /// replaces.
    pub add_indices: Vec<String>,
    /// `modify` column clauses.
    pub modify_columns: Vec<String>,
}

impl AlterPlan {
    /// Returns whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.convert_charset
            && !self.default_collation
            && self.column_charsets.is_empty()
            && self.clauses().is_empty()
    }

    /// Returns the combined `alter table` clauses in emission order.
    #[must_use]
    pub fn clauses(&self) -> Vec<String> {
        self.drop_indices
            .iter()
            .chain(&self.drop_columns)
            .chain(&self.add_columns)
            .chain(&self.add_indices)
            .chain(&self.modify_columns)
            .cloned()
            .collect()
    }

    /// Renders the plan against the desired table.
    #[must_use]
    pub fn into_statements(self, new: &Table) -> Vec<String> {
        let mut statements = Vec::new();
        if self.convert_charset {
            statements.push(new.to_convert_charset_sql());
        } else if self.default_collation {
            statements.push(new.to_default_collation_sql());
        }
        statements.extend(
            self.column_charsets
                .iter()
                .map(|column| new.to_modify_charset_sql(column)),
        );
        if let Some(alter) = new.to_alter_sql(&self.clauses()) {
            statements.push(alter);
        }
        statements
    }
}

/// Computes the alterations between two snapshots of the same table.
#[must_use]
pub fn plan_alter(old: &Table, new: &Table) -> AlterPlan {
    let retargeted = old.collation != new.collation && !new.collation.is_empty();
    let convert_charset = retargeted && old.charset() != new.charset();
    let plan = AlterPlan {
        convert_charset,
        default_collation: retargeted && !convert_charset,
        column_charsets: changed_charsets(old, new, convert_charset),
        drop_indices: dropped_indices(old, new),
        drop_columns: dropped_columns(old, new),
        add_columns: added_columns(old, new),
        add_indices: added_indices(old, new),
        modify_columns: modified_columns(old, new),
    };
    debug!(
        table = %new.name,
        convert_charset = plan.convert_charset,
        default_collation = plan.default_collation,
        column_charsets = plan.column_charsets.len(),
        drop_indices = plan.drop_indices.len(),
        drop_columns = plan.drop_columns.len(),
        add_columns = plan.add_columns.len(),
        add_indices = plan.add_indices.len(),
        modify_columns = plan.modify_columns.len(),
        "Planned table alteration"
    );
    plan
}

fn changed_charsets(old: &Table, new: &Table, converted: bool) -> Vec<Column> {
    let old_columns = old.columns_by_name();
    new.sorted_columns()
        .into_iter()
        .filter(|column| {
            let Some(collation) = column.collation.as_deref() else {
                return false;
            };
            old_columns.get(column.name.as_str()).is_some_and(|previous| {
                previous.charset_differs_from(column) || (converted && collation != new.collation)
            })
        })
        .cloned()
        .collect()
}

fn dropped_indices(old: &Table, new: &Table) -> Vec<String> {
    let remaining = group_by_key_name(&new.indices);
    group_by_key_name(&old.indices)
        .into_iter()
        .filter(|(name, _)| !remaining.contains_key(name))
        .map(|(_, index)| index.to_drop_sql())
        .collect()
}

fn dropped_columns(old: &Table, new: &Table) -> Vec<String> {
    let remaining = new.columns_by_name();
    old.sorted_columns()
        .into_iter()
        .filter(|column| !remaining.contains_key(column.name.as_str()))
        .map(Column::to_drop_sql)
        .collect()
}

fn added_columns(old: &Table, new: &Table) -> Vec<String> {
    let existing = old.columns_by_name();
    new.sorted_columns()
        .into_iter()
        .filter(|column| !existing.contains_key(column.name.as_str()))
        .map(|column| column.to_add_sql(&new.columns, new.collation_ref()))
        .collect()
}

fn added_indices(old: &Table, new: &Table) -> Vec<String> {
    let existing = group_by_key_name(&old.indices);
    let mut clauses = Vec::new();
    for (name, index) in group_by_key_name(&new.indices) {
        match existing.get(&name) {
            None => clauses.push(index.to_add_sql()),
            Some(previous) if !previous.same_composition(&index) => {
                clauses.push(previous.to_drop_sql());
                clauses.push(index.to_add_sql());
            }
            Some(_) => {}
        }
    }
    clauses
}

fn modified_columns(old: &Table, new: &Table) -> Vec<String> {
    let existing = old.columns_by_name();
    new.sorted_columns()
        .into_iter()
        .filter(|column| {
            existing
                .get(column.name.as_str())
                .is_some_and(|previous| previous.differs_from(column))
        })
        .map(|column| column.to_modify_sql(&new.columns, new.collation_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Index;

    fn table() -> Table {
        Table::new("items")
            .collation("utf8_general_ci")
            .column(Column::new("id", 1, "int(11)").not_null())
            .column(Column::new("title", 2, "varchar(64)").collation("utf8_general_ci"))
            .index(Index::primary(&["id"]))
    }

    #[test]
    fn test_nil_input() {
        assert_eq!(diff(None, None), Err(DiffError::NilInput));
    }

    #[test]
    fn test_name_mismatch() {
        let mut renamed = table();
        renamed.name = "things".to_string();
        assert_eq!(
            diff(Some(&table()), Some(&renamed)),
            Err(DiffError::NameMismatch {
                old: "items".to_string(),
                new: "things".to_string(),
            })
        );
    }

    #[test]
    fn test_identical_tables_produce_nothing() {
        assert!(diff(Some(&table()), Some(&table())).unwrap().is_empty());
        assert!(plan_alter(&table(), &table()).is_empty());
    }

    #[test]
    fn test_cardinality_change_produces_nothing() {
        let mut new = table();
        new.indices[0].members[0].cardinality = Some(42);
        new.table_rows = Some(42);
        assert!(diff(Some(&table()), Some(&new)).unwrap().is_empty());
    }

    #[test]
    fn test_table_charset_conversion() {
        let mut new = table().collation("utf8mb4_general_ci");
        new.columns[1].collation = Some("utf8mb4_general_ci".to_string());
        new.columns[1].character_set = Some("utf8mb4".to_string());
        assert_eq!(
            diff(Some(&table()), Some(&new)).unwrap(),
            vec![
                "alter table `items` convert to character set utf8mb4 collate utf8mb4_general_ci"
                    .to_string(),
                "alter table `items` modify `title` varchar(64) character set utf8mb4 collate utf8mb4_general_ci"
                    .to_string(),
            ]
        );
    }

    fn nicknames(collation: &str, nick: &str) -> Table {
        Table::new("t")
            .collation(collation)
            .column(Column::new("id", 1, "int(11)").not_null())
            .column(Column::new("nick", 2, "varchar(32)").collation(nick))
            .column(Column::new("title", 3, "varchar(64)").collation(collation))
    }

    #[test]
    fn test_collation_change_keeps_charset() {
        let old = nicknames("utf8mb4_general_ci", "utf8mb4_bin");
        let mut new = nicknames("utf8mb4_unicode_ci", "utf8mb4_bin");
        new.columns[2].collation = Some("utf8mb4_general_ci".to_string());

        let plan = plan_alter(&old, &new);
        assert!(!plan.convert_charset);
        assert!(plan.default_collation);
        assert!(plan.column_charsets.is_empty());
        assert_eq!(
            diff(Some(&old), Some(&new)).unwrap(),
            vec!["alter table `t` default collate utf8mb4_unicode_ci".to_string()]
        );
    }

    #[test]
    fn test_conversion_restores_own_collations() {
        let old = nicknames("utf8_general_ci", "latin1_swedish_ci");
        let new = nicknames("utf8mb4_general_ci", "latin1_swedish_ci");
        assert_eq!(
            diff(Some(&old), Some(&new)).unwrap(),
            vec![
                "alter table `t` convert to character set utf8mb4 collate utf8mb4_general_ci"
                    .to_string(),
                "alter table `t` modify `nick` varchar(32) character set latin1 collate latin1_swedish_ci"
                    .to_string(),
                "alter table `t` modify `title` varchar(64) character set utf8mb4 collate utf8mb4_general_ci"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_primary_key_replacement() {
        let new = Table {
            indices: vec![Index::primary(&["id", "title"])],
            ..table()
        };
        assert_eq!(
            diff(Some(&table()), Some(&new)).unwrap(),
            vec!["alter table `items`\n\tdrop primary key,\n\tadd primary key (`id`,`title`)".to_string()]
        );
    }

    #[test]
    fn test_plan_groups_clauses() {
        let new = table()
            .column(Column::new("body", 3, "text"))
            .index(Index::new("k_title", &["title"]));
        let plan = plan_alter(&table(), &new);
        assert_eq!(plan.add_columns, vec!["add `body` text after `title`".to_string()]);
        assert_eq!(plan.add_indices, vec!["add key `k_title` (`title`)".to_string()]);
        assert!(plan.drop_columns.is_empty());
        assert!(plan.modify_columns.is_empty());
        assert_eq!(plan.clauses().len(), 2);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let old = table();
        let new = table().column(Column::new("body", 3, "text"));
        let before = (old.clone(), new.clone());
        diff(Some(&old), Some(&new)).unwrap();
        assert_eq!((old, new), before);
    }
}
