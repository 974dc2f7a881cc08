//! Bank store port - local persistence abstraction

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{BankLink, TransferTransaction, User};

/// Local persistence abstraction for the read paths
///
/// Adapters provide the actual database access; lookups of a single
/// record return `Error::NotFound` when it is absent.
#[async_trait]
pub trait BankStore: Send + Sync {
    /// All bank links owned by a user
    async fn get_banks(&self, user_id: &str) -> Result<Vec<BankLink>>;

    /// One bank link by its local id
    async fn get_bank(&self, link_id: &str) -> Result<BankLink>;

    /// The user of the current session (`Error::Unauthorized` if none)
    async fn get_logged_in_user(&self) -> Result<User>;

    /// Transfers where the bank is sender or receiver
    async fn get_transactions_by_bank_id(&self, bank_id: &str) -> Result<Vec<TransferTransaction>>;

    /// Transfers recorded by an account
    async fn get_transactions_by_account_id(
        &self,
        account_id: &str,
    ) -> Result<Vec<TransferTransaction>>;
}
