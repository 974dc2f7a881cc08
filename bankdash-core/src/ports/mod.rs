//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod aggregator;
mod store;
mod transaction_provider;

pub use aggregator::{AccountBalances, AccountsGetResponse, AggregatorAccount, AggregatorClient, Item};
pub use store::BankStore;
pub use transaction_provider::TransactionProvider;
