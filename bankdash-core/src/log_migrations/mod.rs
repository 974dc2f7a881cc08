//! Event log database migrations, embedded at compile time
//!
//! Applied to logs.duckdb through the same migration runner as the bank
//! store, in name order.

use crate::services::migration::MigrationSet;

pub const LOG_MIGRATIONS: MigrationSet = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_event_log.sql", include_str!("001_event_log.sql")),
];
