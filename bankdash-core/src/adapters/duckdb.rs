//! DuckDB bank store implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::domain::{BankLink, TransferTransaction, User};
use crate::ports::BankStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

const TRANSFER_COLUMNS: &str = "transfer_id, name, CAST(amount AS VARCHAR), channel, category,
     sender_bank_id, receiver_bank_id, account_id, created_at";

const LINK_COLUMNS: &str =
    "link_id, user_id, access_token, shareable_id, account_id, institution_id, created_at";

/// DuckDB-backed store for users, bank links and transfers
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the store at `db_path`
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; JSON is linked in via the Cargo feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        Ok(conn)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Run pending schema migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Users ===

    pub fn add_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_users (user_id, email, first_name, last_name, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                user.id,
                user.email,
                user.first_name,
                user.last_name,
                format_timestamp(Utc::now()),
            ],
        )
        .with_context(|| format!("Failed to add user {}", user.email))?;
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                "SELECT user_id, email, first_name, last_name FROM sys_users WHERE user_id = ?",
                [user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        first_name: row.get(2)?,
                        last_name: row.get(3)?,
                    })
                },
            )
            .map(Some)
            .or_else(no_rows)?;
        Ok(user)
    }

    pub fn get_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, email, first_name, last_name FROM sys_users ORDER BY email",
        )?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(users)
    }

    // === Session ===

    /// Make `user_id` the logged-in user, replacing any previous session
    pub fn set_session_user(&self, user_id: &str) -> Result<()> {
        if self.get_user(user_id)?.is_none() {
            anyhow::bail!("No user with id {}", user_id);
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_session (slot, user_id, logged_in_at) VALUES (1, ?, ?)
             ON CONFLICT (slot) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                logged_in_at = EXCLUDED.logged_in_at",
            params![user_id, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    pub fn clear_session(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sys_session", [])?;
        Ok(())
    }

    pub fn session_user_id(&self) -> Result<Option<String>> {
        let conn = self.lock()?;
        let user_id = conn
            .query_row("SELECT user_id FROM sys_session WHERE slot = 1", [], |row| {
                row.get(0)
            })
            .map(Some)
            .or_else(no_rows)?;
        Ok(user_id)
    }

    // === Bank links ===

    pub fn add_bank_link(&self, link: &BankLink) -> Result<()> {
        link.validate().map_err(|e| anyhow!(e))?;
        if self.get_user(&link.user_id)?.is_none() {
            anyhow::bail!("No user with id {}", link.user_id);
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_bank_links (link_id, user_id, access_token, shareable_id,
                                         account_id, institution_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                link.id,
                link.user_id,
                link.access_token,
                link.shareable_id,
                link.account_id,
                link.institution_id,
                format_timestamp(link.created_at),
            ],
        )
        .with_context(|| format!("Failed to add bank link {}", link.id))?;
        Ok(())
    }

    pub fn get_bank_link(&self, link_id: &str) -> Result<Option<BankLink>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM sys_bank_links WHERE link_id = ?", LINK_COLUMNS),
                [link_id],
                read_link_row,
            )
            .map(Some)
            .or_else(no_rows)?;
        raw.map(RawLink::into_link).transpose()
    }

    pub fn get_bank_links(&self, user_id: &str) -> Result<Vec<BankLink>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_bank_links WHERE user_id = ? ORDER BY created_at, link_id",
            LINK_COLUMNS
        ))?;
        let rows = stmt
            .query_map([user_id], read_link_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        rows.into_iter().map(RawLink::into_link).collect()
    }

    // === Transfers ===

    pub fn add_transfer(&self, transfer: &TransferTransaction) -> Result<()> {
        transfer.validate().map_err(|e| anyhow!(e))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_transfers (transfer_id, name, amount, channel, category,
                                        sender_bank_id, receiver_bank_id, account_id, created_at)
             VALUES (?, ?, CAST(? AS DECIMAL(18, 2)), ?, ?, ?, ?, ?, ?)",
            params![
                transfer.id,
                transfer.name,
                transfer.amount.to_string(),
                transfer.channel,
                transfer.category,
                transfer.sender_bank_id,
                transfer.receiver_bank_id,
                transfer.account_id,
                format_timestamp(transfer.created_at),
            ],
        )
        .with_context(|| format!("Failed to add transfer {}", transfer.id))?;
        Ok(())
    }

    /// Transfers where the bank is either side
    pub fn get_transfers_by_bank(&self, bank_id: &str) -> Result<Vec<TransferTransaction>> {
        self.query_transfers(
            "WHERE sender_bank_id = ? OR receiver_bank_id = ?",
            &[bank_id, bank_id],
        )
    }

    pub fn get_transfers_by_account(&self, account_id: &str) -> Result<Vec<TransferTransaction>> {
        self.query_transfers("WHERE account_id = ?", &[account_id])
    }

    pub fn get_transfer_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM sys_transfers", [], |row| row.get(0))?;
        Ok(count)
    }

    fn query_transfers(&self, filter: &str, args: &[&str]) -> Result<Vec<TransferTransaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_transfers {} ORDER BY created_at, transfer_id",
            TRANSFER_COLUMNS, filter
        ))?;
        let rows = stmt
            .query_map(duckdb::params_from_iter(args.iter()), read_transfer_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        rows.into_iter().map(RawTransfer::into_transfer).collect()
    }
}

// Row helpers: columns are read as text and converted outside the driver
// callback so conversion failures carry context.

struct RawLink {
    id: String,
    user_id: String,
    access_token: String,
    shareable_id: String,
    account_id: Option<String>,
    institution_id: Option<String>,
    created_at: String,
}

fn read_link_row(row: &duckdb::Row) -> duckdb::Result<RawLink> {
    Ok(RawLink {
        id: row.get(0)?,
        user_id: row.get(1)?,
        access_token: row.get(2)?,
        shareable_id: row.get(3)?,
        account_id: row.get(4)?,
        institution_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl RawLink {
    fn into_link(self) -> Result<BankLink> {
        Ok(BankLink {
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("bank link {}", self.id))?,
            id: self.id,
            user_id: self.user_id,
            access_token: self.access_token,
            shareable_id: self.shareable_id,
            account_id: self.account_id,
            institution_id: self.institution_id,
        })
    }
}

struct RawTransfer {
    id: String,
    name: String,
    amount: String,
    channel: String,
    category: String,
    sender_bank_id: String,
    receiver_bank_id: String,
    account_id: String,
    created_at: String,
}

fn read_transfer_row(row: &duckdb::Row) -> duckdb::Result<RawTransfer> {
    Ok(RawTransfer {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        channel: row.get(3)?,
        category: row.get(4)?,
        sender_bank_id: row.get(5)?,
        receiver_bank_id: row.get(6)?,
        account_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl RawTransfer {
    fn into_transfer(self) -> Result<TransferTransaction> {
        let amount = self
            .amount
            .parse::<Decimal>()
            .with_context(|| format!("transfer {} has invalid amount '{}'", self.id, self.amount))?;
        let created_at = parse_timestamp(&self.created_at)
            .with_context(|| format!("transfer {}", self.id))?;
        Ok(TransferTransaction {
            id: self.id,
            name: self.name,
            amount,
            created_at,
            channel: self.channel,
            category: self.category,
            sender_bank_id: self.sender_bank_id,
            receiver_bank_id: self.receiver_bank_id,
            account_id: self.account_id,
        })
    }
}

/// Map a missing row to `None`
fn no_rows<T>(err: duckdb::Error) -> duckdb::Result<Option<T>> {
    match err {
        duckdb::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    }
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp '{}'", s))
}

fn store_error(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{:#}", e))
}

#[async_trait]
impl BankStore for DuckDbRepository {
    async fn get_banks(&self, user_id: &str) -> DomainResult<Vec<BankLink>> {
        self.get_bank_links(user_id).map_err(store_error)
    }

    async fn get_bank(&self, link_id: &str) -> DomainResult<BankLink> {
        self.get_bank_link(link_id)
            .map_err(store_error)?
            .ok_or_else(|| DomainError::not_found(format!("bank link {}", link_id)))
    }

    async fn get_logged_in_user(&self) -> DomainResult<User> {
        let user_id = self
            .session_user_id()
            .map_err(store_error)?
            .ok_or_else(|| DomainError::unauthorized("no user is logged in"))?;
        self.get_user(&user_id)
            .map_err(store_error)?
            .ok_or_else(|| DomainError::unauthorized(format!("session user {} no longer exists", user_id)))
    }

    async fn get_transactions_by_bank_id(
        &self,
        bank_id: &str,
    ) -> DomainResult<Vec<TransferTransaction>> {
        self.get_transfers_by_bank(bank_id).map_err(store_error)
    }

    async fn get_transactions_by_account_id(
        &self,
        account_id: &str,
    ) -> DomainResult<Vec<TransferTransaction>> {
        self.get_transfers_by_account(account_id).map_err(store_error)
    }
}
