//! Per-table fan-out of the pure differs.
//!
//! Each table is diffed on the blocking pool, at most `workers` at a time.
//! Results are gathered in completion order and then sorted by table name, so
//! the output does not depend on scheduling. A table's own statements keep
//! the order its differ produced.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use joinery_core::data_diff::{ReconcileOptions, Reconciler};
use joinery_core::model::Table;
use joinery_core::rows::Chunk;
use joinery_core::schema_diff;
use tracing::debug;

use crate::error::{JoineryError, Result};

/// Runs `job` once per named input on a bounded worker pool.
///
/// Returns the successful outputs sorted by name. If any job fails, every
/// failure is returned instead, each tagged with its name.
pub async fn map_reduce<I, T, F>(inputs: Vec<(String, I)>, workers: usize, job: F) -> Result<Vec<(String, T)>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Result<T> + Send + Sync + 'static,
{
    let job = Arc::new(job);
    let mut outcomes: Vec<(String, Result<T>)> = stream::iter(inputs)
        .map(|(name, input)| {
            let job = Arc::clone(&job);
            async move {
                let result = tokio::task::spawn_blocking(move || job(input))
                    .await
                    .unwrap_or_else(|e| Err(JoineryError::Worker(e)));
                (name, result)
            }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;
    outcomes.sort_by(|a, b| a.0.cmp(&b.0));

    let mut values = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (name, result) in outcomes {
        match result {
            Ok(value) => values.push((name, value)),
            Err(e) => errors.push(e.in_table(name)),
        }
    }
    match JoineryError::aggregate(errors) {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

/// Diffs the live tables against the desired ones.
///
/// Tables only present live are dropped when `with_drop` is set and left
/// alone otherwise. Statements are grouped by table, tables by name.
pub async fn plan_build(live: Vec<Table>, desired: Vec<Table>, with_drop: bool, workers: usize) -> Result<Vec<String>> {
    let mut live: BTreeMap<String, Table> = live.into_iter().map(|t| (t.name.clone(), t)).collect();
    let mut desired: BTreeMap<String, Table> =
        desired.into_iter().map(|t| (t.name.clone(), t)).collect();
    let names: BTreeSet<String> = live.keys().chain(desired.keys()).cloned().collect();

    let mut inputs = Vec::with_capacity(names.len());
    for name in names {
        let old = live.remove(&name);
        let new = desired.remove(&name);
        if new.is_none() && !with_drop {
            debug!(table = %name, "Keeping table missing from the sources");
            continue;
        }
        inputs.push((name, (old, new)));
    }

    let planned = map_reduce(inputs, workers, |(old, new): (Option<Table>, Option<Table>)| {
        Ok(schema_diff::diff(old.as_ref(), new.as_ref())?)
    })
    .await?;
    Ok(flatten(planned))
}

/// Reconciles live chunks against desired ones, one job per desired chunk.
///
/// A missing live chunk means every desired row is inserted.
pub async fn plan_import(
    pairs: Vec<(Option<Chunk>, Chunk)>,
    options: ReconcileOptions,
    workers: usize,
) -> Result<Vec<String>> {
    let reconciler = Reconciler::with_options(options);
    let inputs = pairs
        .into_iter()
        .map(|(old, new)| (new.table.clone(), (old, new)))
        .collect();
    let planned = map_reduce(inputs, workers, move |(old, new): (Option<Chunk>, Chunk)| {
        Ok(reconciler.reconcile(old.as_ref(), Some(&new))?)
    })
    .await?;
    Ok(flatten(planned))
}

fn flatten(planned: Vec<(String, Vec<String>)>) -> Vec<String> {
    planned.into_iter().flat_map(|(_, statements)| statements).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use joinery_core::error::DiffError;
    use joinery_core::model::Column;
    use joinery_core::seed;

    use super::*;

    fn table(name: &str) -> Table {
        Table::new(name).column(Column::new("id", 1, "int(11)").not_null())
    }

    #[tokio::test]
    async fn test_map_reduce_sorts_by_name() {
        let inputs: Vec<(String, u64)> = vec![
            ("a".to_string(), 30),
            ("b".to_string(), 20),
            ("c".to_string(), 10),
        ];
        let results = map_reduce(inputs, 3, |delay| {
            std::thread::sleep(Duration::from_millis(delay));
            Ok(vec![delay, delay + 1])
        })
        .await
        .unwrap();
        assert_eq!(
            results,
            vec![
                ("a".to_string(), vec![30, 31]),
                ("b".to_string(), vec![20, 21]),
                ("c".to_string(), vec![10, 11]),
            ]
        );
    }

    #[tokio::test]
    async fn test_map_reduce_collects_every_error() {
        let inputs: Vec<(String, bool)> = vec![
            ("ok".to_string(), true),
            ("bad2".to_string(), false),
            ("bad1".to_string(), false),
        ];
        let err = map_reduce(inputs, 2, |ok| {
            if ok {
                Ok(())
            } else {
                Err(DiffError::NilInput.into())
            }
        })
        .await
        .unwrap_err();
        match err {
            JoineryError::Multiple(errors) => {
                let tables: Vec<String> = errors
                    .iter()
                    .map(|e| match e {
                        JoineryError::Table { table, .. } => table.clone(),
                        other => panic!("unexpected error {other:?}"),
                    })
                    .collect();
                assert_eq!(tables, vec!["bad1", "bad2"]);
            }
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plan_build_respects_with_drop() {
        let live = vec![table("legacy"), table("users")];
        let desired = vec![table("users"), table("orders")];

        let kept = plan_build(live.clone(), desired.clone(), false, 4).await.unwrap();
        assert_eq!(kept, vec![table("orders").to_create_sql()]);

        let dropped = plan_build(live, desired, true, 4).await.unwrap();
        assert_eq!(
            dropped,
            vec![table("legacy").to_drop_sql(), table("orders").to_create_sql()]
        );
    }

    #[tokio::test]
    async fn test_plan_import() {
        let old = Chunk::new("users", &["id", "name"], vec![seed![1, "a"], seed![2, "b"]]);
        let new = Chunk::new("users", &["id", "name"], vec![seed![2, "b"], seed![3, "c"]]);
        let fresh = Chunk::new("colors", &["id", "name"], vec![seed![1, "red"]]);
        let statements = plan_import(
            vec![(Some(old), new), (None, fresh.clone())],
            ReconcileOptions::new(),
            2,
        )
        .await
        .unwrap();
        assert_eq!(
            statements,
            vec![
                fresh.to_insert_sql()[0].clone(),
                "delete from `users` where `id` in (\n1\n)".to_string(),
                "insert into `users`(`id`,`name`)\nvalues\n(3,'c')".to_string(),
            ]
        );
    }
}
