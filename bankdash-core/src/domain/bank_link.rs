//! Bank link domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local record tying a user to an aggregator access credential
///
/// Created when the user links an account; the read paths never modify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankLink {
    pub id: String,
    pub user_id: String,
    /// Aggregator access token; never serialized back out
    #[serde(skip_serializing, default)]
    pub access_token: String,
    /// Public identifier the user can share to receive transfers
    pub shareable_id: String,
    /// Aggregator account id captured at link time
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub institution_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BankLink {
    /// Create a new link with a generated id
    pub fn new(
        user_id: impl Into<String>,
        access_token: impl Into<String>,
        shareable_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            user_id: user_id.into(),
            access_token: access_token.into(),
            shareable_id: shareable_id.into(),
            account_id: None,
            institution_id: None,
            created_at: Utc::now(),
        }
    }

    /// Validate link data before it is stored
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.id.trim().is_empty() {
            return Err("bank link id cannot be empty");
        }
        if self.user_id.trim().is_empty() {
            return Err("bank link user cannot be empty");
        }
        if self.access_token.trim().is_empty() {
            return Err("access token cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_is_not_serialized() {
        let link = BankLink::new("user-1", "access-sandbox-secret", "share-1");
        let json = serde_json::to_string(&link).unwrap();
        assert!(!json.contains("access-sandbox-secret"));
        assert!(json.contains("shareableId"));
    }

    #[test]
    fn test_link_validation() {
        let mut link = BankLink::new("user-1", "token", "share-1");
        assert!(link.validate().is_ok());

        link.access_token = "  ".to_string();
        assert!(link.validate().is_err());
    }
}
