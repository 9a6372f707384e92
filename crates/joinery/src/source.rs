//! Declarative sources: JSON table definitions and CSV seed files.
//!
//! Both loaders read one directory, non-recursively. For CSV files the table
//! name is the file name up to its first `.`, so `users.csv`,
//! `users.part1.csv` and `users.part2.csv` all seed `users` and are
//! concatenated in file-name order.
//!
//! Seed cells are loaded as text. Before reconciling, [`conform_to`] types
//! them the same way the live rows are typed; [`infer_types`] guesses types
//! for tables that have no live definition.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use joinery_core::model::{Column, Table};
use joinery_core::rows::{retype, Chunk, Seed, Value};
use serde::Deserialize;
use tracing::debug;

use crate::error::{JoineryError, Result};

/// A definition file holds either a list of tables or a single table.
#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    Many(Vec<Table>),
    One(Box<Table>),
}

/// Lists the files in `dir` whose last extension is `extension`, sorted by
/// name.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.rsplit_once('.'))
            .is_some_and(|(stem, ext)| !stem.is_empty() && ext == extension);
        if matches {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(JoineryError::NoSourceFiles {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
        });
    }
    Ok(files)
}

/// Loads every `*.json` table definition in `dir`.
///
/// A table defined in several files keeps its last definition.
pub fn load_tables(dir: &Path) -> Result<Vec<Table>> {
    let mut tables: BTreeMap<String, Table> = BTreeMap::new();
    for path in list_files(dir, "json")? {
        let file: TableFile = serde_json::from_slice(&fs::read(&path)?)?;
        let parsed = match file {
            TableFile::Many(tables) => tables,
            TableFile::One(table) => vec![*table],
        };
        debug!(path = %path.display(), tables = parsed.len(), "Loaded table definitions");
        for table in parsed {
            tables.insert(table.name.clone(), table);
        }
    }
    Ok(tables.into_values().collect())
}

/// Loads every `*.csv` seed file in `dir`, one chunk per table.
///
/// Cells are [`Value::Text`], or [`Value::Null`] for the NULL markers.
pub fn load_chunks(dir: &Path) -> Result<Vec<Chunk>> {
    let mut chunks: BTreeMap<String, Chunk> = BTreeMap::new();
    for path in list_files(dir, "csv")? {
        let table = table_name(&path)?;
        let (columns, seeds) = parse_csv(fs::File::open(&path)?)?;
        debug!(path = %path.display(), table = %table, rows = seeds.len(), "Loaded seed file");

        match chunks.get_mut(&table) {
            Some(chunk) if chunk.columns != columns => {
                return Err(JoineryError::InvalidSource {
                    path,
                    message: format!("columns differ from other seed files of table '{table}'"),
                });
            }
            Some(chunk) => chunk.seeds.extend(seeds),
            None => {
                chunks.insert(
                    table.clone(),
                    Chunk {
                        table,
                        columns,
                        seeds,
                    },
                );
            }
        }
    }
    Ok(chunks.into_values().collect())
}

fn table_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| JoineryError::InvalidSource {
            path: path.to_path_buf(),
            message: "cannot derive a table name".to_string(),
        })
}

/// Parses CSV content: a header row of column names, then one row per seed.
///
/// Rows may be shorter or longer than the header. Cells are kept as text
/// apart from the NULL markers.
pub fn parse_csv<R: Read>(reader: R) -> Result<(Vec<String>, Vec<Seed>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let columns: Vec<String> = reader.headers()?.iter().map(ToString::to_string).collect();
    let mut seeds = Vec::new();
    for record in reader.records() {
        let record = record?;
        seeds.push(Seed::new(record.iter().map(raw_value).collect()));
    }
    Ok((columns, seeds))
}

fn is_null_marker(cell: &str) -> bool {
    matches!(cell, "NULL" | "null" | "Null")
}

fn raw_value(cell: &str) -> Value {
    if is_null_marker(cell) {
        Value::Null
    } else {
        Value::Text(cell.to_string())
    }
}

/// Types every cell of `chunk` from the data type of the matching column
/// of `table`, as [`crate::introspect::Introspector::chunk`] does for live
/// rows. Columns `table` lacks fall back to [`infer_value`].
#[must_use]
pub fn conform_to(chunk: Chunk, table: &Table) -> Chunk {
    let types: Vec<Option<String>> = chunk
        .columns
        .iter()
        .map(|name| table.get_column(name).map(Column::base_type))
        .collect();
    map_cells(chunk, |i, value| match (types.get(i).cloned().flatten(), value) {
        (_, Value::Null) => Value::Null,
        (Some(data_type), value) => retype(&data_type, value.raw_text()),
        (None, Value::Text(cell)) => infer_value(&cell),
        (None, value) => value,
    })
}

/// Types every text cell of `chunk` with [`infer_value`].
#[must_use]
pub fn infer_types(chunk: Chunk) -> Chunk {
    map_cells(chunk, |_, value| match value {
        Value::Text(cell) => infer_value(&cell),
        value => value,
    })
}

fn map_cells<F>(chunk: Chunk, convert: F) -> Chunk
where
    F: Fn(usize, Value) -> Value,
{
    let seeds = chunk
        .seeds
        .into_iter()
        .map(|seed| {
            Seed::new(
                seed.values
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| convert(i, value))
                    .collect(),
            )
        })
        .collect();
    Chunk { seeds, ..chunk }
}

/// Infers a typed value from a CSV cell.
///
/// `NULL`, `null` and `Null` are NULL. Numeric cells become numbers unless
/// they have more than one character and start with `0`, which keeps codes
/// such as zip codes and `0.5`-style strings intact. Everything else is
/// text.
#[must_use]
pub fn infer_value(cell: &str) -> Value {
    if is_null_marker(cell) {
        return Value::Null;
    }
    if cell.len() > 1 && cell.starts_with('0') {
        return Value::Text(cell.to_string());
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::Int(n);
    }
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::Text(cell.to_string()),
    }
}
