//! Aggregator port
//!
//! Defines the interface to the third-party financial-data aggregator
//! (Plaid-shaped). Response types mirror the aggregator's wire format.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::Institution;

/// Response of an accounts lookup for one access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountsGetResponse {
    pub accounts: Vec<AggregatorAccount>,
    pub item: Item,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl AccountsGetResponse {
    /// A link carries one account; the first one is the linked account
    pub fn primary_account(&self) -> Result<&AggregatorAccount> {
        self.accounts
            .first()
            .ok_or_else(|| Error::not_found(format!("item {} has no accounts", self.item.item_id)))
    }

    pub fn institution_id(&self) -> Result<&str> {
        self.item.institution_id.as_deref().ok_or_else(|| {
            Error::invalid(format!("item {} has no institution id", self.item.item_id))
        })
    }
}

/// The aggregator's login item behind an access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,
    #[serde(default)]
    pub institution_id: Option<String>,
}

/// Account as returned by the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorAccount {
    pub account_id: String,
    pub balances: AccountBalances,
    #[serde(default)]
    pub mask: Option<String>,
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalances {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub available: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub current: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub limit: Option<Decimal>,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
}

/// Aggregator client trait
///
/// Implementations perform one request/response round trip per call and
/// map transport failures onto the core error taxonomy.
#[async_trait]
pub trait AggregatorClient: Send + Sync {
    /// Live balances and metadata for the accounts behind an access token
    async fn accounts_get(&self, access_token: &str) -> Result<AccountsGetResponse>;

    /// Display metadata for one institution
    async fn institutions_get_by_id(
        &self,
        institution_id: &str,
        country_codes: &[String],
    ) -> Result<Institution>;
}
