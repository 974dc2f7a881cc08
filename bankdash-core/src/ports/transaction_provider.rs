//! Transaction provider port
//!
//! Source of externally sourced transactions. The merge logic only sees
//! this trait, so a live aggregator feed can replace the mock feed.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{ExternalTransaction, User};

#[async_trait]
pub trait TransactionProvider: Send + Sync {
    /// Provider name (e.g., "mock")
    fn name(&self) -> &str;

    /// External transactions visible to `user` through `access_token`
    ///
    /// The returned order is the provider's; callers sort.
    async fn get_transactions(
        &self,
        access_token: &str,
        user: &User,
    ) -> Result<Vec<ExternalTransaction>>;
}
