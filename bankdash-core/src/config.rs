//! Configuration management
//!
//! settings.json in the data directory:
//! ```json
//! {
//!   "aggregator": { "environment": "sandbox", "clientId": "...", "secret": "...",
//!                   "countryCode": "US", "timeoutSecs": 30 },
//!   "batchPolicy": "all-or-nothing"
//! }
//! ```
//! Keys the CLI does not manage are preserved when saving.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::plaid::{PlaidEnvironment, DEFAULT_TIMEOUT_SECS};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_COUNTRY_CODE: &str = "US";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    aggregator: AggregatorSettings,
    #[serde(default)]
    batch_policy: BatchPolicy,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Connection settings for the aggregation API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorSettings {
    #[serde(default)]
    pub environment: PlaidEnvironment,
    /// Overrides the environment's base URL
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            environment: PlaidEnvironment::default(),
            base_url: None,
            client_id: None,
            secret: None,
            country_code: default_country_code(),
            timeout_secs: default_timeout_secs(),
            other: HashMap::new(),
        }
    }
}

impl AggregatorSettings {
    pub fn has_credentials(&self) -> bool {
        self.client_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// How a multi-account read treats per-link failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchPolicy {
    /// First failure fails the whole read
    #[default]
    AllOrNothing,
    /// Failed links are reported next to the successful ones
    ReportPartial,
}

impl FromStr for BatchPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all-or-nothing" => Ok(BatchPolicy::AllOrNothing),
            "report-partial" => Ok(BatchPolicy::ReportPartial),
            other => anyhow::bail!(
                "Unknown batch policy '{}' (expected all-or-nothing or report-partial)",
                other
            ),
        }
    }
}

impl fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchPolicy::AllOrNothing => f.write_str("all-or-nothing"),
            BatchPolicy::ReportPartial => f.write_str("report-partial"),
        }
    }
}

/// Effective configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub aggregator: AggregatorSettings,
    pub batch_policy: BatchPolicy,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the data directory, then apply environment overrides
    ///
    /// Recognized variables: PLAID_CLIENT_ID, PLAID_SECRET, PLAID_ENV,
    /// PLAID_BASE_URL, BANKDASH_BATCH_POLICY.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(data_dir)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load config from settings.json only
    pub fn load_file(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        Ok(Self {
            aggregator: raw.aggregator.clone(),
            batch_policy: raw.batch_policy,
            _raw_settings: raw,
        })
    }

    /// Apply overrides from a variable lookup; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(client_id) = get("PLAID_CLIENT_ID") {
            self.aggregator.client_id = Some(client_id);
        }
        if let Some(secret) = get("PLAID_SECRET") {
            self.aggregator.secret = Some(secret);
        }
        if let Some(env) = get("PLAID_ENV") {
            self.aggregator.environment = env.parse::<PlaidEnvironment>()?;
        }
        if let Some(base_url) = get("PLAID_BASE_URL") {
            self.aggregator.base_url = Some(base_url);
        }
        if let Some(policy) = get("BANKDASH_BATCH_POLICY") {
            self.batch_policy = policy.parse()?;
        }
        Ok(())
    }

    /// Save config to the data directory
    /// Preserves other settings that the CLI doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let settings_path = data_dir.join(SETTINGS_FILE);

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        let preserved = std::mem::take(&mut settings.aggregator.other);
        settings.aggregator = self.aggregator.clone();
        settings.aggregator.other.extend(preserved);
        settings.batch_policy = self.batch_policy;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Set a managed key by its dotted settings path
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |v: &str| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };
        match key {
            "aggregator.environment" => self.aggregator.environment = value.parse()?,
            "aggregator.baseUrl" => self.aggregator.base_url = optional(value),
            "aggregator.clientId" => self.aggregator.client_id = optional(value),
            "aggregator.secret" => self.aggregator.secret = optional(value),
            "aggregator.countryCode" => {
                let code = value.trim().to_uppercase();
                if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                    anyhow::bail!("Country code must be two letters, got '{}'", value);
                }
                self.aggregator.country_code = code;
            }
            "aggregator.timeoutSecs" => {
                let secs: u64 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid timeout '{}'", value))?;
                if secs == 0 {
                    anyhow::bail!("Timeout must be at least one second");
                }
                self.aggregator.timeout_secs = secs;
            }
            "batchPolicy" => self.batch_policy = value.parse()?,
            other => anyhow::bail!("Unknown setting '{}'", other),
        }
        Ok(())
    }
}
