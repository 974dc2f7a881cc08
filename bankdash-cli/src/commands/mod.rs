//! CLI command implementations

pub mod accounts;
pub mod config;
pub mod institution;
pub mod link;
pub mod logs;
pub mod transfer;
pub mod user;

use std::future::Future;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use bankdash_core::services::{EntryPoint, LogEvent, LoggingService};
use bankdash_core::BankdashContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!("failed to write event log: {}", e);
        }
    }
}

/// Data directory from BANKDASH_DIR or ~/.bankdash
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKDASH_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bankdash"))
        .ok_or_else(|| anyhow!("Could not find home directory; set BANKDASH_DIR"))
}

/// Open the store and load configuration
pub fn get_context() -> Result<BankdashContext> {
    let data_dir = get_data_dir()?;
    BankdashContext::new(&data_dir)
        .with_context(|| format!("Failed to open bankdash data in {}", data_dir.display()))
}

/// Run a future to completion on a fresh runtime
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

/// User id from the flag, or the logged-in user
pub fn resolve_user(ctx: &BankdashContext, user: Option<String>) -> Result<String> {
    match user {
        Some(id) => Ok(id),
        None => ctx
            .repository
            .session_user_id()?
            .ok_or_else(|| anyhow!("No user is logged in. Run `bankdash user login` or pass --user")),
    }
}
