//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Plaid HTTP client for AggregatorClient
//! - DuckDB for the BankStore port
//! - Built-in mock feed for TransactionProvider

pub mod duckdb;
pub mod mock_feed;
pub mod plaid;

#[cfg(test)]
pub mod plaid_mock;
