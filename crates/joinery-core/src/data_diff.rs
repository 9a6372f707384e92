//! Data differ: reconciles two row chunks of one table into ordered DML.
//!
//! Rows are matched on a comparison column (`id` by default). Deletions, or
//! a single `truncate` when the desired chunk is empty, come first, then
//! replacements, then insertions, so a row that moves between keys never
//! collides with one being replaced.

use tracing::debug;

use crate::error::{DiffError, Result};
use crate::rows::{Chunk, KeyedRows, Seed, DEFAULT_BATCH_SIZE};

/// Column rows are matched on unless told otherwise.
pub const DEFAULT_COMPARISON_COLUMN: &str = "id";

/// Options for the [`Reconciler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Column used as the row identity.
    pub comparison_column: String,
    /// Rows per emitted statement.
    pub batch_size: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcileOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            comparison_column: DEFAULT_COMPARISON_COLUMN.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Matches rows on `column`.
    #[must_use]
    pub fn with_comparison_column(mut self, column: impl Into<String>) -> Self {
        self.comparison_column = column.into();
        self
    }

    /// Emits at most `batch_size` rows per statement. Zero is treated as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Reconciles row chunks.
#[derive(Debug, Default)]
pub struct Reconciler {
    options: ReconcileOptions,
}

impl Reconciler {
    /// Creates a reconciler with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reconciler with custom options.
    #[must_use]
    pub const fn with_options(options: ReconcileOptions) -> Self {
        Self { options }
    }

    /// Returns the options in use.
    #[must_use]
    pub const fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Computes the DML that turns `old` into `new`.
    pub fn reconcile(&self, old: Option<&Chunk>, new: Option<&Chunk>) -> Result<Vec<String>> {
        let column = self.options.comparison_column.as_str();
        let batch = self.options.batch_size;

        let (old, new) = match (old, new) {
            (None, None) => return Err(DiffError::NilInput),
            (Some(old), None) => {
                old.column_index(column)?;
                return Ok(Self::truncate_if_populated(old));
            }
            (old, Some(new)) => (old, new),
        };

        let new_rows = new.keyed_rows(column)?;
        let Some(old) = old else {
            let rows: Vec<&Seed> = new_rows.iter().map(|(_, seed)| seed).collect();
            return Ok(new.insert_sql_for(&rows, batch));
        };
        let old_rows = old.keyed_rows(column)?;

        if new.seeds.is_empty() {
            return Ok(Self::truncate_if_populated(old));
        }

        let deleted: Vec<&Seed> = old_rows
            .iter()
            .filter(|(key, _)| !new_rows.contains(key))
            .map(|(_, seed)| seed)
            .collect();
        let replaced = changed_rows(old, &old_rows, new, &new_rows);
        let inserted: Vec<&Seed> = new_rows
            .iter()
            .filter(|(key, _)| !old_rows.contains(key))
            .map(|(_, seed)| seed)
            .collect();

        debug!(
            table = %new.table,
            deleted = deleted.len(),
            replaced = replaced.len(),
            inserted = inserted.len(),
            "Reconciled rows"
        );

        let mut statements = old.delete_sql_for(old.column_index(column)?, &deleted, batch);
        statements.extend(new.replace_sql_for(&replaced, batch));
        statements.extend(new.insert_sql_for(&inserted, batch));
        Ok(statements)
    }

    fn truncate_if_populated(old: &Chunk) -> Vec<String> {
        if old.seeds.is_empty() {
            Vec::new()
        } else {
            debug!(table = %old.table, rows = old.seeds.len(), "Table will be truncated");
            vec![old.to_truncate_sql()]
        }
    }
}

/// Reconciles two chunks with the default batch size.
///
/// `comparison_column` defaults to [`DEFAULT_COMPARISON_COLUMN`].
pub fn reconcile(
    old: Option<&Chunk>,
    new: Option<&Chunk>,
    comparison_column: Option<&str>,
) -> Result<Vec<String>> {
    let options = ReconcileOptions::new()
        .with_comparison_column(comparison_column.unwrap_or(DEFAULT_COMPARISON_COLUMN));
    Reconciler::with_options(options).reconcile(old, new)
}

/// Rows present on both sides whose values differ, in new-chunk order.
///
/// Values are aligned by column name and compared on their rendered SQL
/// literal. Columns the old chunk has but the new one lacks are not
/// compared.
fn changed_rows<'a>(
    old: &Chunk,
    old_rows: &KeyedRows<'_>,
    new: &Chunk,
    new_rows: &KeyedRows<'a>,
) -> Vec<&'a Seed> {
    let alignment: Vec<Option<usize>> = new
        .columns
        .iter()
        .map(|name| old.columns.iter().position(|c| c == name))
        .collect();

    new_rows
        .iter()
        .filter_map(|(key, seed)| old_rows.get(key).map(|previous| (previous, seed)))
        .filter(|(previous, seed)| {
            alignment.iter().enumerate().any(|(i, position)| {
                let before = position.and_then(|p| previous.rendered(p));
                before != seed.rendered(i)
            })
        })
        .map(|(_, seed)| seed)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::Value;
    use crate::seed;

    fn chunk(seeds: Vec<Seed>) -> Chunk {
        Chunk::new("seed_test", &["id", "name"], seeds)
    }

    #[test]
    fn test_nil_input() {
        assert_eq!(reconcile(None, None, None), Err(DiffError::NilInput));
    }

    #[test]
    fn test_missing_comparison_column() {
        let c = chunk(vec![seed![10, "A"]]);
        assert_eq!(
            reconcile(Some(&c), Some(&c), Some("uuid")),
            Err(DiffError::Lookup {
                table: "seed_test".to_string(),
                column: "uuid".to_string(),
            })
        );
        assert!(matches!(
            reconcile(None, Some(&c), Some("uuid")),
            Err(DiffError::Lookup { .. })
        ));
        assert!(matches!(
            reconcile(Some(&c), None, Some("uuid")),
            Err(DiffError::Lookup { .. })
        ));
    }

    #[test]
    fn test_replace_only_changed_row() {
        let old = chunk(vec![seed![10, "A"], seed![20, "B"]]);
        let new = chunk(vec![seed![10, "C"], seed![20, "B"]]);
        assert_eq!(
            reconcile(Some(&old), Some(&new), None).unwrap(),
            vec!["replace into `seed_test`(`id`,`name`)\nvalues\n(10,'C')".to_string()]
        );
    }

    #[test]
    fn test_delete_before_insert() {
        let old = chunk(vec![seed![10, "A"], seed![20, "B"]]);
        let new = chunk(vec![seed![20, "B"], seed![30, "C"]]);
        assert_eq!(
            reconcile(Some(&old), Some(&new), None).unwrap(),
            vec![
                "delete from `seed_test` where `id` in (\n10\n)".to_string(),
                "insert into `seed_test`(`id`,`name`)\nvalues\n(30,'C')".to_string(),
            ]
        );
    }

    #[test]
    fn test_truncate_when_new_is_empty_or_absent() {
        let old = chunk(vec![seed![10, "A"]]);
        let empty = chunk(Vec::new());
        let expected = vec!["truncate table `seed_test`".to_string()];
        assert_eq!(reconcile(Some(&old), Some(&empty), None).unwrap(), expected);
        assert_eq!(reconcile(Some(&old), None, None).unwrap(), expected);
        assert!(reconcile(Some(&empty), Some(&empty), None).unwrap().is_empty());
    }

    #[test]
    fn test_keyless_rows_never_truncate() {
        let old = chunk(vec![seed![10, "A"]]);
        let short = Chunk::new("seed_test", &["name", "id"], vec![seed!["A"]]);
        assert_eq!(
            reconcile(Some(&old), Some(&short), None),
            Err(DiffError::MissingKey {
                table: "seed_test".to_string(),
                column: "id".to_string(),
                row: 0,
            })
        );
    }

    #[test]
    fn test_values_compare_by_rendering() {
        let old = chunk(vec![seed![10, Value::Float(1.0)]]);
        let new = chunk(vec![seed![10, 1]]);
        assert!(reconcile(Some(&old), Some(&new), None).unwrap().is_empty());
    }

    #[test]
    fn test_alignment_by_column_name() {
        let old = Chunk::new("seed_test", &["name", "id", "extra"], vec![seed!["A", 10, "x"]]);
        let new = chunk(vec![seed![10, "A"]]);
        assert!(reconcile(Some(&old), Some(&new), None).unwrap().is_empty());

        let widened = Chunk::new("seed_test", &["id", "name", "note"], vec![seed![10, "A", "n"]]);
        assert_eq!(reconcile(Some(&new), Some(&widened), None).unwrap().len(), 1);
    }

    #[test]
    fn test_custom_options() {
        let old = Chunk::new("t", &["code", "v"], vec![seed!["a", 1], seed!["b", 2]]);
        let new = Chunk::new(
            "t",
            &["code", "v"],
            vec![seed!["a", 1], seed!["c", 3], seed!["d", 4], seed!["e", 5]],
        );
        let reconciler = Reconciler::with_options(
            ReconcileOptions::new()
                .with_comparison_column("code")
                .with_batch_size(2),
        );
        let statements = reconciler.reconcile(Some(&old), Some(&new)).unwrap();
        assert_eq!(
            statements,
            vec![
                "delete from `t` where `code` in (\n'b'\n)".to_string(),
                "insert into `t`(`code`,`v`)\nvalues\n('c',3),\n('d',4)".to_string(),
                "insert into `t`(`code`,`v`)\nvalues\n('e',5)".to_string(),
            ]
        );
    }

    #[test]
    fn test_duplicate_keys_fail() {
        let old = chunk(vec![seed![10, "A"]]);
        let new = chunk(vec![seed![10, "A"], seed![10, "B"]]);
        assert!(matches!(
            reconcile(Some(&old), Some(&new), None),
            Err(DiffError::DuplicateKey { .. })
        ));
    }
}
