//! Account view models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::ErrorKind;
use super::transaction::MergedTransaction;

/// Normalized projection of one linked aggregator account
///
/// Derived on every read, never persisted.
/// Note: `account_type`/`subtype` use the aggregator's nomenclature
/// ("depository", "credit", "loan", ... / "checking", "savings", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub available_balance: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_balance: Decimal,
    pub institution_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_name: Option<String>,
    pub name: String,
    pub official_name: Option<String>,
    pub mask: Option<String>,
    #[serde(rename = "type")]
    pub account_type: String,
    pub subtype: Option<String>,
    /// Local bank link this view was built from
    pub link_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shareable_id: Option<String>,
}

/// A bank link that could not be resolved during a batch read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFailure {
    pub link_id: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// All accounts for a user plus aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsOverview {
    pub data: Vec<AccountView>,
    /// Number of bank links retrieved for the user
    pub total_banks: usize,
    /// Exact sum of `current_balance` over `data`
    #[serde(with = "rust_decimal::serde::float")]
    pub total_current_balance: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AccountFailure>,
}

impl AccountsOverview {
    /// Build the overview, computing the balance total from `data`
    pub fn new(data: Vec<AccountView>, total_banks: usize, failures: Vec<AccountFailure>) -> Self {
        let total_current_balance = data.iter().map(|a| a.current_balance).sum();
        Self {
            data,
            total_banks,
            total_current_balance,
            failures,
        }
    }

    /// True if every retrieved link produced a view
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One account with its merged transaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetail {
    pub data: AccountView,
    pub transactions: Vec<MergedTransaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(link_id: &str, current: Decimal) -> AccountView {
        AccountView {
            id: format!("acc-{}", link_id),
            available_balance: None,
            current_balance: current,
            institution_id: "ins_1".to_string(),
            institution_name: None,
            name: "Checking".to_string(),
            official_name: None,
            mask: Some("0000".to_string()),
            account_type: "depository".to_string(),
            subtype: Some("checking".to_string()),
            link_id: link_id.to_string(),
            shareable_id: None,
        }
    }

    #[test]
    fn test_overview_total_is_exact_sum() {
        let overview = AccountsOverview::new(
            vec![view("b1", Decimal::new(1000, 1)), view("b2", Decimal::new(2505, 1))],
            2,
            Vec::new(),
        );
        assert_eq!(overview.total_banks, 2);
        assert_eq!(overview.total_current_balance, Decimal::new(3505, 1));
        assert!(overview.is_complete());
    }

    #[test]
    fn test_account_view_json_shape() {
        let mut v = view("b1", Decimal::new(12345, 2));
        v.available_balance = Some(Decimal::new(10000, 2));
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["currentBalance"], 123.45);
        assert_eq!(json["availableBalance"], 100.0);
        assert_eq!(json["type"], "depository");
        assert_eq!(json["linkId"], "b1");
        assert!(json.get("shareableId").is_none());
    }

    #[test]
    fn test_empty_overview() {
        let overview = AccountsOverview::new(Vec::new(), 0, Vec::new());
        assert_eq!(overview.total_current_balance, Decimal::ZERO);
        let json = serde_json::to_value(&overview).unwrap();
        assert!(json.get("failures").is_none());
    }
}
