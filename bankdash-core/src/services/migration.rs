//! Schema migrations for the DuckDB files
//!
//! A migration set is an ordered list of `(name, sql)` pairs embedded at
//! build time. The first entry creates `sys_migrations`; every later entry
//! runs at most once per database and is recorded there by name.

use std::collections::HashSet;

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

/// Embedded migration set: `(file name, sql)` in application order
pub type MigrationSet = &'static [(&'static str, &'static str)];

/// Outcome of [`MigrationService::run_pending`]
#[derive(Debug, Default)]
pub struct MigrationResult {
    /// Migrations applied by this run, in order
    pub applied: Vec<String>,
    /// Migrations that were already recorded before this run
    pub already_applied: usize,
}

impl MigrationResult {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: MigrationSet,
}

impl<'a> MigrationService<'a> {
    /// Runner for the bank store schema
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    pub fn with_migrations(conn: &'a Connection, migrations: MigrationSet) -> Self {
        Self { conn, migrations }
    }

    /// Apply every migration not yet recorded in `sys_migrations`
    ///
    /// Each migration runs in its own transaction together with the row
    /// that records it, so a failing file leaves no partial schema behind.
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let Some((bootstrap, bootstrap_sql)) = self.migrations.first() else {
            return Ok(MigrationResult::default());
        };

        // The bootstrap file is idempotent (CREATE TABLE IF NOT EXISTS)
        self.conn
            .execute_batch(bootstrap_sql)
            .with_context(|| format!("bootstrap migration {} failed", bootstrap))?;

        let mut recorded = self.recorded()?;
        let mut result = MigrationResult::default();

        for (name, sql) in self.migrations {
            if recorded.contains(*name) {
                result.already_applied += 1;
                continue;
            }
            self.apply(name, sql)?;
            recorded.insert(name.to_string());
            result.applied.push(name.to_string());
        }

        if !result.is_noop() {
            tracing::info!(applied = ?result.applied, "migrations applied");
        }
        Ok(result)
    }

    /// Names recorded in `sys_migrations`, in name order
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Names in this set that have not been recorded yet
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded = match self.recorded() {
            Ok(set) => set,
            // No sys_migrations table yet
            Err(_) => HashSet::new(),
        };
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }

    fn recorded(&self) -> Result<HashSet<String>> {
        Ok(self.get_applied()?.into_iter().collect())
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        let outcome = self.conn.execute_batch(sql).and_then(|_| {
            self.conn
                .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])
                .map(|_| ())
        });
        match outcome {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e).with_context(|| format!("migration {} failed", name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_migrations::LOG_MIGRATIONS;

    #[test]
    fn test_fresh_database_applies_everything_once() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        let first = service.run_pending().unwrap();
        assert_eq!(first.applied.len(), MIGRATIONS.len());
        assert_eq!(first.already_applied, 0);

        let second = service.run_pending().unwrap();
        assert!(second.is_noop());
        assert_eq!(second.already_applied, MIGRATIONS.len());
        assert_eq!(service.get_applied().unwrap().len(), MIGRATIONS.len());
    }

    #[test]
    fn test_pending_before_and_after_bootstrap() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);
        assert_eq!(service.get_pending().unwrap().len(), MIGRATIONS.len());

        conn.execute_batch(MIGRATIONS[0].1).unwrap();
        conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [MIGRATIONS[0].0],
        )
        .unwrap();

        let pending = service.get_pending().unwrap();
        assert_eq!(pending.len(), MIGRATIONS.len() - 1);
        assert!(!pending.iter().any(|n| n == MIGRATIONS[0].0));
    }

    #[test]
    fn test_failed_migration_is_not_recorded() {
        const BROKEN: MigrationSet = &[
            ("000_migrations.sql", include_str!("../migrations/000_migrations.sql")),
            ("001_broken.sql", "CREATE TABLE ok_table (id INTEGER); SELEC nonsense;"),
        ];
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::with_migrations(&conn, BROKEN);

        assert!(service.run_pending().is_err());
        assert_eq!(service.get_applied().unwrap(), vec!["000_migrations.sql".to_string()]);
        assert_eq!(service.get_pending().unwrap(), vec!["001_broken.sql".to_string()]);
    }

    #[test]
    fn test_log_migration_set() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::with_migrations(&conn, LOG_MIGRATIONS);
        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), LOG_MIGRATIONS.len());
    }
}
