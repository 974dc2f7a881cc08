//! Plaid API client
//!
//! Handles communication with the Plaid API for account balances and
//! institution metadata. Every endpoint is a JSON POST that carries the
//! client credentials in the body.
//!
//! API Documentation: https://plaid.com/docs/api/

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::AggregatorSettings;
use crate::domain::result::{Error, Result};
use crate::domain::Institution;
use crate::ports::{AccountsGetResponse, AggregatorClient};

// =============================================================================
// Environments
// =============================================================================

const PLAID_SANDBOX_URL: &str = "https://sandbox.plaid.com";
const PLAID_DEVELOPMENT_URL: &str = "https://development.plaid.com";
const PLAID_PRODUCTION_URL: &str = "https://production.plaid.com";

/// Plaid deployment the credentials belong to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => PLAID_SANDBOX_URL,
            PlaidEnvironment::Development => PLAID_DEVELOPMENT_URL,
            PlaidEnvironment::Production => PLAID_PRODUCTION_URL,
        }
    }
}

impl FromStr for PlaidEnvironment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" => Ok(PlaidEnvironment::Sandbox),
            "development" => Ok(PlaidEnvironment::Development),
            "production" => Ok(PlaidEnvironment::Production),
            other => Err(Error::Config(format!("Unknown Plaid environment '{}'", other))),
        }
    }
}

impl fmt::Display for PlaidEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaidEnvironment::Sandbox => "sandbox",
            PlaidEnvironment::Development => "development",
            PlaidEnvironment::Production => "production",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Wire models
// =============================================================================

#[derive(Debug, Serialize)]
struct AccountsGetRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
}

#[derive(Debug, Serialize)]
struct InstitutionsGetByIdRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    institution_id: &'a str,
    country_codes: &'a [String],
}

#[derive(Debug, Deserialize)]
struct InstitutionsGetByIdResponse {
    institution: Institution,
}

/// Error body returned by Plaid on any non-200 response
#[derive(Debug, Default, Deserialize)]
struct PlaidErrorBody {
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

// =============================================================================
// Plaid HTTP Client
// =============================================================================

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Plaid API client
#[derive(Debug)]
pub struct PlaidClient {
    client: Client,
    base_url: String,
    client_id: String,
    secret: String,
    timeout: Duration,
}

impl PlaidClient {
    /// Create a client for one of the hosted Plaid environments
    pub fn new(client_id: &str, secret: &str, environment: PlaidEnvironment) -> Result<Self> {
        Self::new_with_base_url(
            client_id,
            secret,
            environment.base_url(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a client against a custom base URL (mock servers, proxies)
    ///
    /// Plain HTTP is only accepted for loopback hosts.
    pub fn new_with_base_url(
        client_id: &str,
        secret: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if client_id.trim().is_empty() || secret.trim().is_empty() {
            return Err(Error::Config(
                "Plaid client id and secret are required".to_string(),
            ));
        }

        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid Plaid base URL '{}': {}", base_url, e)))?;
        let host = parsed.host_str().unwrap_or("");
        let loopback = host == "127.0.0.1" || host == "localhost";
        if parsed.scheme() != "https" && !loopback {
            return Err(Error::Config("Plaid base URL must use HTTPS".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
            timeout,
        })
    }

    /// Build a client from the aggregator section of the settings
    pub fn from_settings(settings: &AggregatorSettings) -> Result<Self> {
        let client_id = settings
            .client_id
            .as_deref()
            .ok_or_else(|| Error::Config("Plaid clientId not found in settings".to_string()))?;
        let secret = settings
            .secret
            .as_deref()
            .ok_or_else(|| Error::Config("Plaid secret not found in settings".to_string()))?;

        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| settings.environment.base_url().to_string());

        Self::new_with_base_url(
            client_id,
            secret,
            &base_url,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and decode a 200 response
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            let body: PlaidErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::invalid(format!("Failed to parse Plaid {} response: {}", path, e)))
    }

    /// Map request errors to the core taxonomy
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::upstream(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs_f32()
            ))
        } else if error.is_connect() {
            Error::upstream("Unable to connect to Plaid servers")
        } else {
            Error::upstream(format!("Plaid request failed: {}", error))
        }
    }
}

/// Map a non-200 response onto the core taxonomy
fn classify_error(status: u16, body: &PlaidErrorBody) -> Error {
    let code = body.error_code.as_deref().unwrap_or("");
    let detail = match (&body.error_type, &body.error_message) {
        (Some(t), Some(m)) => format!("{} {}: {}", t, code, m),
        (None, Some(m)) => m.clone(),
        _ => format!("HTTP {}", status),
    };

    match (status, code) {
        (400, "INVALID_ACCESS_TOKEN" | "ITEM_LOGIN_REQUIRED" | "INVALID_API_KEYS") => {
            Error::unauthorized(format!("Plaid rejected the credentials ({})", detail))
        }
        (400, "INVALID_INSTITUTION" | "INSTITUTION_NOT_FOUND") => {
            Error::not_found(format!("Plaid institution not found ({})", detail))
        }
        (400, _) => Error::invalid(format!("Plaid rejected the request ({})", detail)),
        (401 | 403, _) => Error::unauthorized(format!("Plaid access denied ({})", detail)),
        (404, _) => Error::not_found(format!("Plaid resource not found ({})", detail)),
        (429, _) => Error::upstream(format!("Plaid rate limit exceeded ({})", detail)),
        (500..=599, _) => Error::upstream(format!("Plaid is unavailable ({})", detail)),
        _ => Error::upstream(format!("Plaid API error ({})", detail)),
    }
}

#[async_trait]
impl AggregatorClient for PlaidClient {
    async fn accounts_get(&self, access_token: &str) -> Result<AccountsGetResponse> {
        let request = AccountsGetRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            access_token,
        };
        self.post("/accounts/get", &request).await
    }

    async fn institutions_get_by_id(
        &self,
        institution_id: &str,
        country_codes: &[String],
    ) -> Result<Institution> {
        let request = InstitutionsGetByIdRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            institution_id,
            country_codes,
        };
        let response: InstitutionsGetByIdResponse =
            self.post("/institutions/get_by_id", &request).await?;
        Ok(response.institution)
    }
}
