//! Statement executor.
//!
//! Applies a statement list in order on a single connection, or prints it
//! when running dry.

use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::{JoineryError, Result};

const DISABLE_FOREIGN_KEY_CHECKS: &str = "set foreign_key_checks = 0";
const ENABLE_FOREIGN_KEY_CHECKS: &str = "set foreign_key_checks = 1";

/// Executes generated statements against a database.
#[derive(Debug, Clone)]
pub struct Executor {
    pool: MySqlPool,
    dry_run: bool,
    foreign_key_checks: bool,
}

impl Executor {
    /// Creates an executor that applies statements with foreign key checks
    /// enabled.
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            dry_run: false,
            foreign_key_checks: true,
        }
    }

    /// Creates an executor configured from `config`.
    pub fn from_config(pool: MySqlPool, config: &RunConfig) -> Self {
        Self::new(pool)
            .dry_run(config.dry_run)
            .foreign_key_checks(config.foreign_key_checks)
    }

    /// Enables dry-run mode (SQL is printed but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Keeps or suspends foreign key checks while statements run.
    #[must_use]
    pub const fn foreign_key_checks(mut self, enabled: bool) -> Self {
        self.foreign_key_checks = enabled;
        self
    }

    /// Returns the full script for `statements`, including the foreign key
    /// switches when checks are suspended. Empty input yields an empty
    /// script.
    #[must_use]
    pub fn script(&self, statements: &[String]) -> Vec<String> {
        if statements.is_empty() {
            return Vec::new();
        }
        let mut script = Vec::with_capacity(statements.len() + 2);
        if !self.foreign_key_checks {
            script.push(DISABLE_FOREIGN_KEY_CHECKS.to_string());
        }
        script.extend(statements.iter().cloned());
        if !self.foreign_key_checks {
            script.push(ENABLE_FOREIGN_KEY_CHECKS.to_string());
        }
        script
    }

    /// Runs `statements` in order and returns how many were applied.
    ///
    /// Session settings only hold for one connection, so the whole script
    /// runs on a single acquired connection. Execution stops at the first
    /// failing statement.
    pub async fn execute(&self, statements: &[String]) -> Result<usize> {
        let script = self.script(statements);
        if script.is_empty() {
            info!("Nothing to apply");
            return Ok(0);
        }

        if self.dry_run {
            for sql in &script {
                debug!(sql = %sql, "Executing SQL");
                println!("{sql};");
            }
            return Ok(statements.len());
        }

        let mut conn = self.pool.acquire().await?;
        for sql in &script {
            debug!(sql = %sql, "Executing SQL");
            sqlx::query(sql)
                .execute(&mut *conn)
                .await
                .map_err(|source| JoineryError::Execute {
                    statement: sql.clone(),
                    source,
                })?;
        }
        info!(statements = statements.len(), "Applied statements");
        Ok(statements.len())
    }
}
