//! Writers for table definitions (JSON) and table contents (CSV).

use std::fs;
use std::path::{Path, PathBuf};

use joinery_core::model::Table;
use joinery_core::rows::{Chunk, Value, TIME_FORMAT};
use regex::Regex;
use tracing::info;

use crate::error::Result;

/// File name used when all definitions go into one file.
pub const COMBINED_DESIGN_FILE: &str = "tables.json";

/// Writes table definitions as JSON.
///
/// With `separate`, each table goes to `<table>.json`; otherwise all tables
/// go to [`COMBINED_DESIGN_FILE`]. Every file holds a JSON array so that
/// [`crate::source::load_tables`] reads both layouts. Returns the written
/// paths.
pub fn write_design(dir: &Path, tables: &[Table], pretty: bool, separate: bool) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    if separate {
        for table in tables {
            let path = dir.join(format!("{}.json", table.name));
            write_json(&path, std::slice::from_ref(table), pretty)?;
            written.push(path);
        }
    } else {
        let path = dir.join(COMBINED_DESIGN_FILE);
        write_json(&path, tables, pretty)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "Wrote table definitions");
    Ok(written)
}

fn write_json(path: &Path, tables: &[Table], pretty: bool) -> Result<()> {
    let buf = if pretty {
        serde_json::to_vec_pretty(tables)?
    } else {
        serde_json::to_vec(tables)?
    };
    fs::write(path, buf)?;
    Ok(())
}

/// Writes a chunk to `<dir>/<table>.csv`, header first. Returns the path.
pub fn write_csv(dir: &Path, chunk: &Chunk) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.csv", chunk.table));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(&chunk.columns)?;
    for seed in &chunk.seeds {
        writer.write_record(seed.values.iter().map(csv_cell))?;
    }
    writer.flush()?;
    Ok(path)
}

/// Renders a value the way the seed loader reads it back.
#[must_use]
pub fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::DateTime(t) => t.format(TIME_FORMAT).to_string(),
    }
}

/// Keeps the tables whose name matches `pattern`.
#[must_use]
pub fn filter_tables<'a>(tables: &'a [Table], pattern: &Regex) -> Vec<&'a Table> {
    tables
        .iter()
        .filter(|table| pattern.is_match(&table.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use joinery_core::seed;

    #[test]
    fn test_csv_cell() {
        assert_eq!(csv_cell(&Value::Null), "NULL");
        assert_eq!(csv_cell(&Value::Int(7)), "7");
        assert_eq!(csv_cell(&Value::Float(2.5)), "2.5");
        assert_eq!(csv_cell(&Value::Text("a,b".into())), "a,b");
    }

    #[test]
    fn test_filter_tables() {
        let tables = vec![Table::new("users"), Table::new("user_roles"), Table::new("orders")];
        let pattern = Regex::new("^user").unwrap();
        let names: Vec<&str> = filter_tables(&tables, &pattern)
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["users", "user_roles"]);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let chunk = Chunk::new(
            "users",
            &["id", "name", "note"],
            vec![seed![1, "Ann, Lee", Value::Null], seed![2, "Bob", "x"]],
        );
        let path = write_csv(dir.path(), &chunk).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "id,name,note\n1,\"Ann, Lee\",NULL\n2,Bob,x\n"
        );
    }
}
