//! Mock transaction feed
//!
//! Stands in for the aggregator's transaction endpoint: a fixed set of ten
//! feed records followed by the logged-in user's stored transfers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{ExternalTransaction, FeedTransaction, User};
use crate::ports::{BankStore, TransactionProvider};

const MOCK_TRANSACTIONS_JSON: &str = include_str!("mock_transactions.json");

/// Parse the built-in feed records
pub fn mock_feed_transactions() -> Result<Vec<FeedTransaction>> {
    Ok(serde_json::from_str(MOCK_TRANSACTIONS_JSON)?)
}

/// Access token with all but the last four characters masked
fn redact_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let visible = chars.len().saturating_sub(4);
    let tail: String = chars[visible..].iter().collect();
    format!("{}{}", "*".repeat(visible.min(8)), tail)
}

/// Transaction provider backed by the built-in dataset and the local store
pub struct MockFeedProvider {
    store: Arc<dyn BankStore>,
    feed: Vec<FeedTransaction>,
}

impl MockFeedProvider {
    pub fn new(store: Arc<dyn BankStore>) -> Result<Self> {
        Ok(Self {
            store,
            feed: mock_feed_transactions()?,
        })
    }
}

#[async_trait]
impl TransactionProvider for MockFeedProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_transactions(
        &self,
        access_token: &str,
        user: &User,
    ) -> Result<Vec<ExternalTransaction>> {
        // The token does not select data here
        tracing::debug!(
            access_token = %redact_token(access_token),
            "using mock transaction feed"
        );

        let stored = self
            .store
            .get_transactions_by_account_id(&user.id)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, "failed to read stored transfers: {}", e);
                e
            })?;

        let mut transactions: Vec<ExternalTransaction> =
            Vec::with_capacity(self.feed.len() + stored.len());
        transactions.extend(self.feed.iter().map(FeedTransaction::to_external));
        transactions.extend(stored.iter().map(|t| t.to_external()));
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::Error;
    use crate::domain::{BankLink, TransferTransaction};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    #[test]
    fn test_redacted_token_keeps_only_tail() {
        let redacted = redact_token("access-sandbox-8f3c");
        assert_eq!(redacted, "********8f3c");
        assert!(!redacted.contains("sandbox"));
        assert_eq!(redact_token("abc"), "abc");
    }

    struct FixedStore {
        transfers: Vec<TransferTransaction>,
    }

    #[async_trait]
    impl BankStore for FixedStore {
        async fn get_banks(&self, _user_id: &str) -> Result<Vec<BankLink>> {
            Ok(vec![])
        }

        async fn get_bank(&self, link_id: &str) -> Result<BankLink> {
            Err(Error::not_found(link_id))
        }

        async fn get_logged_in_user(&self) -> Result<User> {
            Ok(User::new("user-1", "one@example.com"))
        }

        async fn get_transactions_by_bank_id(
            &self,
            _bank_id: &str,
        ) -> Result<Vec<TransferTransaction>> {
            Ok(self.transfers.clone())
        }

        async fn get_transactions_by_account_id(
            &self,
            account_id: &str,
        ) -> Result<Vec<TransferTransaction>> {
            Ok(self
                .transfers
                .iter()
                .filter(|t| t.account_id == account_id)
                .cloned()
                .collect())
        }
    }

    fn stored_transfer() -> TransferTransaction {
        TransferTransaction {
            id: "tr-1".to_string(),
            name: "Rent share".to_string(),
            amount: Decimal::new(40000, 2),
            created_at: Utc.with_ymd_and_hms(2024, 12, 3, 9, 30, 0).unwrap(),
            channel: "online".to_string(),
            category: "Transfer".to_string(),
            sender_bank_id: "b1".to_string(),
            receiver_bank_id: "b2".to_string(),
            account_id: "user-1".to_string(),
        }
    }

    fn provider(transfers: Vec<TransferTransaction>) -> MockFeedProvider {
        MockFeedProvider::new(Arc::new(FixedStore { transfers })).unwrap()
    }

    #[test]
    fn test_builtin_dataset() {
        let feed = mock_feed_transactions().unwrap();
        assert_eq!(feed.len(), 10);
        assert_eq!(feed[0].transaction_id, "674e8cf90018eaa45706");
        assert_eq!(feed[9].name, "Pharmacy");
        assert!(feed.iter().all(|t| t.date.as_str() == "2024-12-01"));
    }

    #[tokio::test]
    async fn test_mock_records_come_first() {
        let user = User::new("user-1", "one@example.com");
        let result = provider(vec![stored_transfer()])
            .get_transactions("access-sandbox-1", &user)
            .await
            .unwrap();

        assert_eq!(result.len(), 11);
        assert_eq!(result[0].id, "674e8cf90018eaa45706");
        assert_eq!(result[0].transaction_type, "in_store");

        let stored = &result[10];
        assert_eq!(stored.id, "tr-1");
        assert_eq!(stored.transaction_type, "Transfer");
        assert_eq!(stored.account_id, "b1");
        assert!(!stored.pending);
        assert_eq!(stored.image, "");
    }

    #[tokio::test]
    async fn test_category_list_reduced_to_first() {
        let user = User::new("user-1", "one@example.com");
        let result = provider(vec![])
            .get_transactions("token", &user)
            .await
            .unwrap();

        let grocery = result.iter().find(|t| t.name == "Grocery Store").unwrap();
        assert_eq!(grocery.category, "Shopping");
        assert!(grocery.image.ends_with("Grocery_store_shelves.jpg"));
    }

    #[tokio::test]
    async fn test_other_users_transfers_excluded() {
        let user = User::new("user-2", "two@example.com");
        let result = provider(vec![stored_transfer()])
            .get_transactions("token", &user)
            .await
            .unwrap();
        assert_eq!(result.len(), 10);
    }

    #[tokio::test]
    async fn test_repeated_calls_identical() {
        let user = User::new("user-1", "one@example.com");
        let provider = provider(vec![stored_transfer()]);
        let first = provider.get_transactions("token", &user).await.unwrap();
        let second = provider.get_transactions("token", &user).await.unwrap();
        assert_eq!(first, second);
    }
}
