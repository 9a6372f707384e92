//! Live MySQL catalog reader.
//!
//! Builds [`Table`] snapshots from `information_schema` and [`Chunk`]s from
//! table contents. Every catalog value is cast to `char` or `unsigned` in
//! SQL so decoding does not depend on the server's catalog column types.

use std::collections::HashMap;

use futures::stream::{self, StreamExt, TryStreamExt};
use joinery_core::model::{
    Column, ColumnKey, Index, IndexMember, Partition, PartitionMethod, Partitioning, Table,
};
use joinery_core::quote;
use joinery_core::rows::{retype, Chunk, Seed};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row;
use tracing::debug;

use crate::error::{JoineryError, Result};

const TABLES_SQL: &str = "select \
    cast(TABLE_NAME as char) as table_name, \
    cast(ENGINE as char) as engine, \
    cast(TABLE_COLLATION as char) as table_collation, \
    cast(TABLE_ROWS as unsigned) as table_rows, \
    cast(AUTO_INCREMENT as unsigned) as auto_increment, \
    cast(CREATE_OPTIONS as char) as create_options \
    from information_schema.tables \
    where TABLE_SCHEMA = ? and TABLE_TYPE = 'BASE TABLE' \
    order by TABLE_NAME";

const COLUMNS_SQL: &str = "select \
    cast(TABLE_CATALOG as char) as table_catalog, \
    cast(TABLE_NAME as char) as table_name, \
    cast(COLUMN_NAME as char) as column_name, \
    cast(ORDINAL_POSITION as unsigned) as ordinal_position, \
    cast(COLUMN_DEFAULT as char) as column_default, \
    cast(IS_NULLABLE as char) as is_nullable, \
    cast(DATA_TYPE as char) as data_type, \
    cast(CHARACTER_SET_NAME as char) as character_set_name, \
    cast(COLLATION_NAME as char) as collation_name, \
    cast(COLUMN_TYPE as char) as column_type, \
    cast(COLUMN_KEY as char) as column_key, \
    cast(EXTRA as char) as extra, \
    cast(PRIVILEGES as char) as privileges, \
    cast(COLUMN_COMMENT as char) as column_comment \
    from information_schema.columns \
    where TABLE_SCHEMA = ? \
    order by TABLE_NAME, ORDINAL_POSITION";

const STATISTICS_SQL: &str = "select \
    cast(TABLE_NAME as char) as table_name, \
    cast(INDEX_NAME as char) as index_name, \
    cast(NON_UNIQUE as signed) as non_unique, \
    cast(COLUMN_NAME as char) as column_name, \
    cast(SUB_PART as unsigned) as sub_part, \
    cast(CARDINALITY as unsigned) as cardinality, \
    cast(INDEX_COMMENT as char) as index_comment \
    from information_schema.statistics \
    where TABLE_SCHEMA = ? \
    order by TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX";

const PARTITIONS_SQL: &str = "select \
    cast(PARTITION_NAME as char) as partition_name, \
    cast(PARTITION_METHOD as char) as partition_method, \
    cast(PARTITION_EXPRESSION as char) as partition_expression, \
    cast(PARTITION_DESCRIPTION as char) as partition_description \
    from information_schema.partitions \
    where TABLE_SCHEMA = ? and TABLE_NAME = ? \
    order by PARTITION_ORDINAL_POSITION";

/// Reads table snapshots and row chunks from one schema.
#[derive(Debug, Clone)]
pub struct Introspector {
    pool: MySqlPool,
    schema: String,
}

impl Introspector {
    /// Creates an introspector for `schema`.
    pub fn new(pool: MySqlPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Returns the schema being read.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Reads every base table of the schema, ordered by name.
    pub async fn tables(&self) -> Result<Vec<Table>> {
        let rows = sqlx::query(TABLES_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;
        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            tables.push(self.table_from_row(row)?);
        }

        let mut columns = self.columns().await?;
        let mut indices = self.indices().await?;
        for table in &mut tables {
            table.columns = columns.remove(&table.name).unwrap_or_default();
            table.indices = indices.remove(&table.name).unwrap_or_default();
            if table.create_options.contains("partitioned") {
                table.partitioning = self.partitioning(&table.name).await?;
            }
        }
        debug!(schema = %self.schema, tables = tables.len(), "Read table definitions");
        Ok(tables)
    }

    /// Reads one table by name.
    pub async fn table(&self, name: &str) -> Result<Table> {
        self.tables()
            .await?
            .into_iter()
            .find(|table| table.name == name)
            .ok_or_else(|| JoineryError::UnknownTable(name.to_string()))
    }

    /// Reads the full contents of `table`.
    ///
    /// Every column is fetched as text and retyped from its catalog data
    /// type with [`retype`](joinery_core::rows::retype).
    pub async fn chunk(&self, table: &Table) -> Result<Chunk> {
        let columns = table.sorted_columns();
        let sql = chunk_query(table);
        debug!(table = %table.name, sql = %sql, "Reading rows");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut seeds = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                let raw: Option<String> = row.try_get(i)?;
                values.push(retype(&column.base_type(), raw));
            }
            seeds.push(Seed::new(values));
        }
        Ok(Chunk {
            table: table.name.clone(),
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            seeds,
        })
    }

    /// Reads the contents of several tables, at most `workers` at a time.
    ///
    /// Chunks come back in completion order.
    pub async fn chunks(&self, tables: Vec<Table>, workers: usize) -> Result<Vec<Chunk>> {
        stream::iter(tables)
            .map(|table| async move {
                self.chunk(&table)
                    .await
                    .map_err(|e| e.in_table(&table.name))
            })
            .buffer_unordered(workers.max(1))
            .try_collect()
            .await
    }

    fn table_from_row(&self, row: &MySqlRow) -> Result<Table> {
        let name: String = row.try_get("table_name")?;
        let engine: Option<String> = row.try_get("engine")?;
        let collation: Option<String> = row.try_get("table_collation")?;
        let mut table = Table::new(name)
            .engine(engine.unwrap_or_default())
            .collation(collation.unwrap_or_default());
        table.schema.clone_from(&self.schema);
        table.table_rows = row.try_get("table_rows")?;
        table.auto_increment = row.try_get("auto_increment")?;
        table.create_options = row
            .try_get::<Option<String>, _>("create_options")?
            .unwrap_or_default();
        Ok(table)
    }

    async fn columns(&self) -> Result<HashMap<String, Vec<Column>>> {
        let rows = sqlx::query(COLUMNS_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;
        let mut columns: HashMap<String, Vec<Column>> = HashMap::new();
        for row in &rows {
            let table: String = row.try_get("table_name")?;
            let position: u64 = row.try_get("ordinal_position")?;
            let nullable: String = row.try_get("is_nullable")?;
            let column = Column {
                name: row.try_get("column_name")?,
                ordinal_position: u32::try_from(position).unwrap_or(u32::MAX),
                column_type: row.try_get("column_type")?,
                data_type: row.try_get("data_type")?,
                nullable: nullable.eq_ignore_ascii_case("YES"),
                default: row.try_get("column_default")?,
                character_set: row.try_get("character_set_name")?,
                collation: row.try_get("collation_name")?,
                key: ColumnKey::from_catalog(&text(row, "column_key")?),
                extra: row
                    .try_get::<Option<String>, _>("extra")?
                    .filter(|extra| !extra.is_empty()),
                comment: text(row, "column_comment")?,
                catalog: text(row, "table_catalog")?,
                schema: self.schema.clone(),
                privileges: text(row, "privileges")?,
            };
            columns.entry(table).or_default().push(column);
        }
        Ok(columns)
    }

    async fn indices(&self) -> Result<HashMap<String, Vec<Index>>> {
        let rows = sqlx::query(STATISTICS_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;
        let mut indices: HashMap<String, Vec<Index>> = HashMap::new();
        for row in &rows {
            let table: String = row.try_get("table_name")?;
            let non_unique: i64 = row.try_get("non_unique")?;
            let sub_part: Option<u64> = row.try_get("sub_part")?;
            let member = IndexMember {
                column: text(row, "column_name")?,
                sub_part: sub_part.and_then(|length| u32::try_from(length).ok()),
                cardinality: row.try_get("cardinality")?,
            };
            let mut index = Index::new(row.try_get::<String, _>("index_name")?, &[]);
            index.unique = non_unique == 0;
            index.comment = text(row, "index_comment")?;
            index.members.push(member);
            push_index_row(indices.entry(table).or_default(), index);
        }
        Ok(indices)
    }

    async fn partitioning(&self, table: &str) -> Result<Option<Partitioning>> {
        let rows = sqlx::query(PARTITIONS_SQL)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        let Some(first) = rows.first() else {
            return Ok(None);
        };
        let method: Option<String> = first.try_get("partition_method")?;
        let Some(method) = method else {
            return Ok(None);
        };
        let mut partitions = Vec::with_capacity(rows.len());
        for row in &rows {
            partitions.push(Partition {
                name: text(row, "partition_name")?,
                description: row.try_get("partition_description")?,
            });
        }
        Ok(Some(Partitioning {
            method: PartitionMethod::from(method),
            expression: text(first, "partition_expression")?,
            partitions,
        }))
    }
}

fn text(row: &MySqlRow, column: &str) -> Result<String> {
    Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
}

/// Appends one statistics row, merging it into the previous entry when both
/// belong to the same key.
pub fn push_index_row(indices: &mut Vec<Index>, row: Index) {
    match indices.last_mut() {
        Some(last) if last.name == row.name => last.members.extend(row.members),
        _ => indices.push(row),
    }
}

/// Builds the query reading every row of `table` as text.
#[must_use]
pub fn chunk_query(table: &Table) -> String {
    let columns: Vec<String> = table
        .sorted_columns()
        .iter()
        .map(|c| {
            let name = quote::ident(&c.name);
            format!("cast({name} as char) as {name}")
        })
        .collect();
    let mut sql = format!("select {} from {}", columns.join(", "), table.quoted_name());

    let order: Vec<&str> = table
        .indices
        .iter()
        .filter(|index| index.is_primary())
        .flat_map(|index| index.members.iter().map(|m| m.column.as_str()))
        .collect();
    if !order.is_empty() {
        sql.push_str(" order by ");
        sql.push_str(&quote::ident_list(&order));
    }
    sql
}
