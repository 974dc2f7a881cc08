//! Bankdash Core - bank data access for a personal-finance dashboard
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (BankLink, AccountView, transactions) and the error taxonomy
//! - **ports**: Trait definitions for external dependencies (AggregatorClient, BankStore, TransactionProvider)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (Plaid, DuckDB, mock feed)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use adapters::mock_feed::MockFeedProvider;
use adapters::plaid::PlaidClient;
use config::Config;
use ports::{AggregatorClient, BankStore};
use services::{AccountService, InstitutionService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult};
pub use domain::{
    AccountDetail, AccountView, AccountsOverview, BankLink, Institution, MergedTransaction,
    TransferTransaction, User,
};

pub const STORE_DB_FILE: &str = "bankdash.duckdb";

/// Main context for bankdash operations
///
/// Holds the configuration and the local store. Services that talk to the
/// aggregator are built on demand, so store-only operations work without
/// aggregator credentials.
pub struct BankdashContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    data_dir: PathBuf,
}

impl BankdashContext {
    /// Open the store in `data_dir` and load configuration
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(STORE_DB_FILE))?);
        repository.ensure_schema()?;

        Ok(Self {
            config,
            repository,
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Aggregator client from the configured credentials
    pub fn aggregator(&self) -> Result<Arc<dyn AggregatorClient>> {
        Ok(Arc::new(PlaidClient::from_settings(&self.config.aggregator)?))
    }

    pub fn institution_service(&self) -> Result<InstitutionService> {
        Ok(self.institution_service_with(self.aggregator()?))
    }

    pub fn institution_service_with(&self, aggregator: Arc<dyn AggregatorClient>) -> InstitutionService {
        InstitutionService::new(aggregator, self.config.aggregator.country_code.clone())
    }

    pub fn account_service(&self) -> Result<AccountService> {
        self.account_service_with(self.aggregator()?)
    }

    /// Account service over an explicit aggregator client
    pub fn account_service_with(&self, aggregator: Arc<dyn AggregatorClient>) -> Result<AccountService> {
        let store: Arc<dyn BankStore> = self.repository.clone();
        let institutions = Arc::new(self.institution_service_with(Arc::clone(&aggregator)));
        let feed = Arc::new(MockFeedProvider::new(Arc::clone(&store))?);

        Ok(AccountService::new(store, aggregator, institutions, feed)
            .with_batch_policy(self.config.batch_policy))
    }
}
