//! Mock Plaid API server for testing
//!
//! Simulates the subset of the Plaid API this crate calls, so the client
//! can be exercised over real HTTP without Plaid credentials:
//! - POST /accounts/get returns { accounts: [...], item: {...}, request_id }
//! - POST /institutions/get_by_id returns { institution: {...}, request_id }
//!
//! Errors use Plaid's error body { error_type, error_code, error_message }.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde_json::{json, Value as JsonValue};

/// Mock Plaid server for testing
pub struct MockPlaidServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// One linked item the mock server knows about
#[derive(Debug, Clone)]
pub struct MockItem {
    pub access_token: String,
    pub institution_id: String,
    pub account_name: String,
    pub current_balance: f64,
    pub available_balance: Option<f64>,
}

impl MockItem {
    pub fn new(access_token: &str, institution_id: &str, current_balance: f64) -> Self {
        Self {
            access_token: access_token.to_string(),
            institution_id: institution_id.to_string(),
            account_name: "Plaid Checking".to_string(),
            current_balance,
            available_balance: Some(current_balance),
        }
    }
}

/// Configuration for the mock server
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub items: Vec<MockItem>,
    /// Secret that authenticates; anything else gets INVALID_API_KEYS
    pub secret: String,
    /// Whether to simulate rate limiting
    pub rate_limit: bool,
    /// Whether to simulate an internal server error
    pub server_error: bool,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            items: vec![
                MockItem::new("access-sandbox-1", "ins_109508", 100.0),
                MockItem::new("access-sandbox-2", "ins_109509", 250.5),
            ],
            secret: "test_secret".to_string(),
            rate_limit: false,
            server_error: false,
            delay_ms: 0,
        }
    }
}

impl MockPlaidServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        // Set listener to non-blocking for graceful shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &cfg);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockPlaidServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one request; returns (method, path, body)
fn read_request(stream: &mut TcpStream) -> Option<(String, String, String)> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);

        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let head = &text[..header_end];
            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            let body_start = header_end + 4;
            if data.len() >= body_start + content_length {
                let mut parts = head.lines().next().unwrap_or("").split_whitespace();
                let method = parts.next()?.to_string();
                let path = parts.next()?.to_string();
                let body = String::from_utf8_lossy(&data[body_start..body_start + content_length])
                    .to_string();
                return Some((method, path, body));
            }
        }
    }
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig) {
    let _ = stream.set_nonblocking(false);

    let Some((method, path, body)) = read_request(&mut stream) else {
        return;
    };

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    if config.rate_limit {
        send_error(&mut stream, 429, "RATE_LIMIT_EXCEEDED", "RATE_LIMIT", "rate limit exceeded");
        return;
    }
    if config.server_error {
        send_error(&mut stream, 500, "API_ERROR", "INTERNAL_SERVER_ERROR", "unexpected error");
        return;
    }

    if method != "POST" {
        send_response(&mut stream, 405, "Method Not Allowed", r#"{"error": "Method not allowed"}"#);
        return;
    }

    let request: JsonValue = serde_json::from_str(&body).unwrap_or(JsonValue::Null);
    if request.get("secret").and_then(|v| v.as_str()) != Some(config.secret.as_str()) {
        send_error(&mut stream, 400, "INVALID_INPUT", "INVALID_API_KEYS", "invalid client_id or secret provided");
        return;
    }

    match path.as_str() {
        "/accounts/get" => {
            let token = request.get("access_token").and_then(|v| v.as_str()).unwrap_or("");
            match config.items.iter().position(|i| i.access_token == token) {
                Some(idx) => {
                    let json = accounts_response(idx, &config.items[idx]).to_string();
                    send_response(&mut stream, 200, "OK", &json);
                }
                None => send_error(
                    &mut stream,
                    400,
                    "INVALID_INPUT",
                    "INVALID_ACCESS_TOKEN",
                    "provided access token is in an invalid format",
                ),
            }
        }
        "/institutions/get_by_id" => {
            let id = request.get("institution_id").and_then(|v| v.as_str()).unwrap_or("");
            if config.items.iter().any(|i| i.institution_id == id) {
                let country_codes = request.get("country_codes").cloned().unwrap_or(json!([]));
                let json = institution_response(id, country_codes).to_string();
                send_response(&mut stream, 200, "OK", &json);
            } else {
                send_error(
                    &mut stream,
                    400,
                    "INVALID_INPUT",
                    "INVALID_INSTITUTION",
                    "invalid institution_id provided",
                );
            }
        }
        _ => send_response(&mut stream, 404, "Not Found", r#"{"error": "Endpoint not found"}"#),
    }
}

fn send_error(stream: &mut TcpStream, status: u16, error_type: &str, code: &str, message: &str) {
    let body = json!({
        "error_type": error_type,
        "error_code": code,
        "error_message": message,
        "display_message": null,
        "request_id": "mock-request"
    });
    let status_text = match status {
        400 => "Bad Request",
        429 => "Too Many Requests",
        _ => "Internal Server Error",
    };
    send_response(stream, status, status_text, &body.to_string());
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn accounts_response(idx: usize, item: &MockItem) -> JsonValue {
    json!({
        "accounts": [{
            "account_id": format!("mock-account-{}", idx + 1),
            "balances": {
                "available": item.available_balance,
                "current": item.current_balance,
                "limit": null,
                "iso_currency_code": "USD"
            },
            "mask": format!("{:04}", (idx + 1) * 1111 % 10000),
            "name": item.account_name,
            "official_name": format!("{} (mock)", item.account_name),
            "type": "depository",
            "subtype": "checking"
        }],
        "item": {
            "item_id": format!("mock-item-{}", idx + 1),
            "institution_id": item.institution_id
        },
        "request_id": "mock-request"
    })
}

fn institution_response(id: &str, country_codes: JsonValue) -> JsonValue {
    json!({
        "institution": {
            "institution_id": id,
            "name": format!("Mock Bank {}", id.trim_start_matches("ins_")),
            "products": ["auth", "balance", "transactions"],
            "country_codes": country_codes,
            "url": "https://mockbank.example.com",
            "primary_color": "#1f1f1f",
            "logo": null,
            "routing_numbers": ["011000138"],
            "oauth": false
        },
        "request_id": "mock-request"
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;
    use crate::adapters::plaid::PlaidClient;
    use crate::domain::result::Error;
    use crate::ports::AggregatorClient;

    fn client(server: &MockPlaidServer, secret: &str) -> PlaidClient {
        PlaidClient::new_with_base_url("test_client", secret, &server.base_url(), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_mock_server_starts() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        assert!(server.port() > 0);
    }

    #[tokio::test]
    async fn test_accounts_get() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let response = client(&server, "test_secret")
            .accounts_get("access-sandbox-2")
            .await
            .unwrap();

        let account = response.primary_account().unwrap();
        assert_eq!(account.balances.current, Some(Decimal::new(2505, 1)));
        assert_eq!(account.account_type, "depository");
        assert_eq!(response.institution_id().unwrap(), "ins_109509");
    }

    #[tokio::test]
    async fn test_institution_lookup_passes_country_codes() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let institution = client(&server, "test_secret")
            .institutions_get_by_id("ins_109508", &["US".to_string()])
            .await
            .unwrap();

        assert_eq!(institution.institution_id, "ins_109508");
        assert_eq!(institution.country_codes, vec!["US".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_access_token_is_unauthorized() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let result = client(&server, "test_secret").accounts_get("access-sandbox-404").await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_bad_secret_is_unauthorized() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let result = client(&server, "wrong").accounts_get("access-sandbox-1").await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_unknown_institution_is_not_found() {
        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let result = client(&server, "test_secret")
            .institutions_get_by_id("ins_0", &["US".to_string()])
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_is_upstream_unavailable() {
        let server = MockPlaidServer::start(MockConfig {
            rate_limit: true,
            ..Default::default()
        })
        .unwrap();
        let result = client(&server, "test_secret").accounts_get("access-sandbox-1").await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
        assert!(err.to_string().to_lowercase().contains("rate limit"));
    }

    #[tokio::test]
    async fn test_server_error_is_upstream_unavailable() {
        let server = MockPlaidServer::start(MockConfig {
            server_error: true,
            ..Default::default()
        })
        .unwrap();
        let result = client(&server, "test_secret").accounts_get("access-sandbox-1").await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_upstream_unavailable() {
        let server = MockPlaidServer::start(MockConfig {
            delay_ms: 1_000,
            ..Default::default()
        })
        .unwrap();
        let client = PlaidClient::new_with_base_url(
            "test_client",
            "test_secret",
            &server.base_url(),
            Duration::from_millis(100),
        )
        .unwrap();
        let result = client.accounts_get("access-sandbox-1").await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_account_service_end_to_end() {
        use std::sync::Arc;

        use crate::adapters::duckdb::DuckDbRepository;
        use crate::adapters::mock_feed::MockFeedProvider;
        use crate::domain::{BankLink, User};
        use crate::ports::BankStore;
        use crate::services::{AccountService, InstitutionService};

        let temp_dir = tempfile::TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&temp_dir.path().join("e2e.duckdb")).unwrap());
        repo.ensure_schema().unwrap();
        repo.add_user(&User::new("user-1", "one@example.com")).unwrap();
        repo.set_session_user("user-1").unwrap();
        let first = BankLink::new("user-1", "access-sandbox-1", "share-1");
        repo.add_bank_link(&first).unwrap();
        repo.add_bank_link(&BankLink::new("user-1", "access-sandbox-2", "share-2"))
            .unwrap();

        let server = MockPlaidServer::start(MockConfig::default()).unwrap();
        let aggregator: Arc<dyn AggregatorClient> = Arc::new(client(&server, "test_secret"));
        let store: Arc<dyn BankStore> = repo.clone();
        let service = AccountService::new(
            Arc::clone(&store),
            Arc::clone(&aggregator),
            Arc::new(InstitutionService::us(aggregator)),
            Arc::new(MockFeedProvider::new(store).unwrap()),
        );

        let overview = service.get_accounts("user-1").await.unwrap();
        assert_eq!(overview.total_banks, 2);
        assert_eq!(overview.total_current_balance, Decimal::new(3505, 1));

        let detail = service.get_account(&first.id).await.unwrap();
        assert_eq!(detail.data.link_id, first.id);
        assert_eq!(detail.data.institution_name.as_deref(), Some("Mock Bank 109508"));
        assert_eq!(detail.transactions.len(), 10);
    }
}
