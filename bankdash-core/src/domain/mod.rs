//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation and mapping logic - no I/O.

mod account;
mod bank_link;
mod institution;
pub mod result;
pub mod transaction;
mod user;

pub use account::{AccountDetail, AccountFailure, AccountView, AccountsOverview};
pub use bank_link::BankLink;
pub use institution::Institution;
pub use transaction::{
    ExternalTransaction, FeedTransaction, MergedTransaction, RawCategory, TransactionDate,
    TransferDirection, TransferEntry, TransferTransaction,
};
pub use user::User;
