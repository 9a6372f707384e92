//! Schema and seed-data reconciliation for MySQL tables.
//!
//! `joinery-core` compares two snapshots of a table and produces the
//! ordered, fully inlined statements that turn the old one into the new one:
//!
//! - The **schema differ** compares [`Table`](model::Table) snapshots and
//!   emits `create`, `drop` or `alter` DDL.
//! - The **data differ** compares [`Chunk`](rows::Chunk)s of rows keyed on a
//!   comparison column and emits `delete`/`truncate`, `replace` and `insert`
//!   DML in batches.
//!
//! Both differs are pure functions. Reading snapshots from a live server or
//! from files, and running the statements, is left to the caller.
//!
//! # Example
//!
//! ```rust
//! use joinery_core::prelude::*;
//!
//! let old = Table::new("users")
//!     .collation("utf8mb4_general_ci")
//!     .column(Column::new("id", 1, "int(11)").not_null())
//!     .index(Index::primary(&["id"]));
//! let new = old
//!     .clone()
//!     .column(Column::new("email", 2, "varchar(255)").not_null());
//!
//! let statements = schema_diff::diff(Some(&old), Some(&new)).unwrap();
//! assert_eq!(
//!     statements,
//!     vec!["alter table `users`\n\tadd `email` varchar(255) not null after `id`"]
//! );
//!
//! let before = Chunk::new("users", &["id", "email"], vec![seed![1, "a@example.com"]]);
//! let after = Chunk::new("users", &["id", "email"], vec![seed![1, "b@example.com"]]);
//! let statements = data_diff::reconcile(Some(&before), Some(&after), None).unwrap();
//! assert_eq!(
//!     statements,
//!     vec!["replace into `users`(`id`,`email`)\nvalues\n(1,'b@example.com')"]
//! );
//! ```

pub mod data_diff;
pub mod error;
pub mod model;
pub mod quote;
pub mod rows;
pub mod schema_diff;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::data_diff::{self, ReconcileOptions, Reconciler};
    pub use crate::error::{DiffError, Result};
    pub use crate::model::{
        Column, ColumnKey, Index, IndexMember, Partition, PartitionMethod, Partitioning, Table,
    };
    pub use crate::rows::{Chunk, Seed, Value};
    pub use crate::schema_diff::{self, AlterPlan};
    pub use crate::seed;
}
