//! Bank store schema: users, bank links, local transfers and the session slot
//!
//! New files are appended here as `NNN_description.sql`; names must sort in
//! application order.

use crate::services::migration::MigrationSet;

pub const MIGRATIONS: MigrationSet = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_users_and_links.sql", include_str!("001_users_and_links.sql")),
    ("002_transfers.sql", include_str!("002_transfers.sql")),
    ("003_session.sql", include_str!("003_session.sql")),
];
