//! Keep a MySQL schema and its seed data in sync with files.
//!
//! `joinery` wires the pure differs of [`joinery_core`] to a live server:
//!
//! - **Introspector** - reads table snapshots and row chunks from
//!   `information_schema` and the tables themselves
//! - **Sources** - loads desired table definitions (JSON) and seed rows (CSV)
//! - **Orchestration** - runs one differ per table on a bounded worker pool
//! - **Executor** - applies the resulting statements, or prints them
//! - **Export** - writes the live state back out as JSON and CSV
//!
//! # CLI Usage
//!
//! ```bash
//! # Write the live table definitions to ./schema/tables.json
//! joinery -d mysql://root@127.0.0.1:3306 -s app design --dir schema --pretty
//!
//! # Show the DDL that brings the server in line with ./schema
//! joinery -d mysql://root@127.0.0.1:3306 -s app --dry-run build --dir schema
//!
//! # Load seed data from ./seeds/*.csv
//! joinery -d mysql://root@127.0.0.1:3306 -s app import --dir seeds
//!
//! # Dump every table whose name starts with `m_` as CSV
//! joinery -d mysql://root@127.0.0.1:3306 -s app export --dir seeds --regexp '^m_'
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod introspect;
pub mod orchestrate;
pub mod source;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::RunConfig;
    pub use crate::error::{JoineryError, Result};
    pub use crate::executor::Executor;
    pub use crate::introspect::Introspector;
    pub use crate::orchestrate::{map_reduce, plan_build, plan_import};
    pub use joinery_core::prelude::*;
}
