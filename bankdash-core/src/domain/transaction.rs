//! Transaction domain models
//!
//! Two feeds meet here: transfers recorded locally between bank links, and
//! transactions coming from the external feed. Both normalize into
//! [`MergedTransaction`], ordered by [`TransactionDate`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::result::{Error, Result};

// =============================================================================
// Dates
// =============================================================================

/// A transaction date that keeps its original text but orders as an instant
///
/// Accepted inputs:
/// - RFC 3339 timestamps (`2024-12-02T10:15:00.000+00:00`)
/// - naive timestamps (`2024-12-02T10:15:00`, `2024-12-02 10:15:00`), read as UTC
/// - plain dates (`2024-12-02`), read as UTC midnight
///
/// Equality and ordering compare instants only, so `2024-12-01` and
/// `2024-12-01T00:00:00Z` are the same date.
#[derive(Debug, Clone)]
pub struct TransactionDate {
    raw: String,
    instant: DateTime<Utc>,
}

impl TransactionDate {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let instant = parse_instant(trimmed)
            .ok_or_else(|| Error::invalid(format!("unrecognized transaction date '{}'", raw)))?;
        Ok(Self {
            raw: trimmed.to_string(),
            instant,
        })
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            raw: dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            instant: dt,
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            raw: date.format("%Y-%m-%d").to_string(),
            instant: date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
}

impl PartialEq for TransactionDate {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for TransactionDate {}

impl PartialOrd for TransactionDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TransactionDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl FromStr for TransactionDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TransactionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for TransactionDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for TransactionDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Locally stored transfers
// =============================================================================

/// Direction of a transfer relative to one bank link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Debit,
    Credit,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::Debit => "debit",
            TransferDirection::Credit => "credit",
        }
    }
}

/// A transfer between two bank links, recorded in the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTransaction {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub channel: String,
    pub category: String,
    pub sender_bank_id: String,
    pub receiver_bank_id: String,
    /// Account (user) that recorded the transfer
    pub account_id: String,
}

impl TransferTransaction {
    /// Debit when the money left `link_id`, credit otherwise
    pub fn direction_for(&self, link_id: &str) -> TransferDirection {
        if self.sender_bank_id == link_id {
            TransferDirection::Debit
        } else {
            TransferDirection::Credit
        }
    }

    /// Normalize for the history of `link_id`
    pub fn to_entry(&self, link_id: &str) -> TransferEntry {
        TransferEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            amount: self.amount,
            date: TransactionDate::from_datetime(self.created_at),
            payment_channel: self.channel.clone(),
            category: self.category.clone(),
            direction: self.direction_for(link_id),
        }
    }

    /// Reshape into the external feed's record format
    ///
    /// The store keeps no pending flag or merchant image, so those are
    /// always `false` and empty.
    pub fn to_external(&self) -> ExternalTransaction {
        ExternalTransaction {
            id: self.id.clone(),
            name: self.name.clone(),
            payment_channel: self.channel.clone(),
            transaction_type: self.category.clone(),
            account_id: self.sender_bank_id.clone(),
            amount: self.amount,
            pending: false,
            category: self.category.clone(),
            date: TransactionDate::from_datetime(self.created_at),
            image: String::new(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("transfer name cannot be empty");
        }
        if self.amount <= Decimal::ZERO {
            return Err("transfer amount must be positive");
        }
        // Stored as DECIMAL(18, 2)
        if self.amount.normalize().scale() > 2 {
            return Err("transfer amount has more than two decimal places");
        }
        if self.sender_bank_id == self.receiver_bank_id {
            return Err("sender and receiver bank must differ");
        }
        Ok(())
    }
}

/// A transfer after normalization for one link's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEntry {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: TransactionDate,
    pub payment_channel: String,
    pub category: String,
    #[serde(rename = "type")]
    pub direction: TransferDirection,
}

// =============================================================================
// External feed
// =============================================================================

/// Category as sent by the feed: a single label or a hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCategory {
    Single(String),
    List(Vec<String>),
}

impl RawCategory {
    /// The label surfaced to the front end: the first entry of a list
    pub fn primary(&self) -> String {
        match self {
            RawCategory::Single(s) => s.clone(),
            RawCategory::List(items) => items.first().cloned().unwrap_or_default(),
        }
    }
}

/// A transaction in the aggregator's wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedTransaction {
    pub transaction_id: String,
    pub name: String,
    pub payment_channel: String,
    pub account_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub category: Option<RawCategory>,
    pub date: TransactionDate,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl FeedTransaction {
    /// Map into the common record; the feed has no separate type so the
    /// payment channel stands in for it
    pub fn to_external(&self) -> ExternalTransaction {
        ExternalTransaction {
            id: self.transaction_id.clone(),
            name: self.name.clone(),
            payment_channel: self.payment_channel.clone(),
            transaction_type: self.payment_channel.clone(),
            account_id: self.account_id.clone(),
            amount: self.amount,
            pending: self.pending,
            category: self
                .category
                .as_ref()
                .map(RawCategory::primary)
                .unwrap_or_default(),
            date: self.date.clone(),
            image: self.logo_url.clone().unwrap_or_default(),
        }
    }
}

/// Normalized externally sourced transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTransaction {
    pub id: String,
    pub name: String,
    pub payment_channel: String,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub account_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub pending: bool,
    pub category: String,
    pub date: TransactionDate,
    pub image: String,
}

// =============================================================================
// Merged view
// =============================================================================

/// Union of both feeds as the front end sees it
///
/// Serialized untagged: each entry is the plain record of its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergedTransaction {
    External(ExternalTransaction),
    Transfer(TransferEntry),
}

impl MergedTransaction {
    pub fn id(&self) -> &str {
        match self {
            MergedTransaction::External(tx) => &tx.id,
            MergedTransaction::Transfer(tx) => &tx.id,
        }
    }

    pub fn date(&self) -> &TransactionDate {
        match self {
            MergedTransaction::External(tx) => &tx.date,
            MergedTransaction::Transfer(tx) => &tx.date,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MergedTransaction::External(tx) => &tx.name,
            MergedTransaction::Transfer(tx) => &tx.name,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            MergedTransaction::External(tx) => tx.amount,
            MergedTransaction::Transfer(tx) => tx.amount,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            MergedTransaction::External(tx) => &tx.category,
            MergedTransaction::Transfer(tx) => &tx.category,
        }
    }

    /// "debit"/"credit" for transfers, the feed's type otherwise
    pub fn kind(&self) -> &str {
        match self {
            MergedTransaction::External(tx) => &tx.transaction_type,
            MergedTransaction::Transfer(tx) => tx.direction.as_str(),
        }
    }
}
