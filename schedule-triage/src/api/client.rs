//! Intercom search client
//!
//! Two idempotent queries: contact-by-email and conversations-by-contact.
//! Both go through the same [`RetryPolicy`], so callers only ever see a
//! rate limit once the retries are exhausted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;

use super::error::LookupError;
use super::models::{Contact, ConversationStub, SearchRequest, SearchResponse};
use super::resilience::{RetryConfig, RetryPolicy};

pub const DEFAULT_BASE_URL: &str = "https://api.intercom.io";
const CONTACTS_SEARCH_PATH: &str = "/contacts/search";
const CONVERSATIONS_SEARCH_PATH: &str = "/conversations/search";
const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Remote lookups needed to enrich a record
#[async_trait]
pub trait ContactLookup: Send + Sync {
    /// Zero or one contact for an email address
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<Contact>, LookupError>;

    /// Conversation total for a contact; `None` when the response carries no count
    async fn count_conversations_for_contact(
        &self,
        contact_id: &str,
    ) -> Result<Option<u64>, LookupError>;
}

/// reqwest-backed Intercom client
#[derive(Debug, Clone)]
pub struct IntercomClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl IntercomClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, retry: RetryConfig) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url, token, retry)
    }

    /// Use a preconfigured reqwest client (proxies, timeouts, test servers)
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry: RetryPolicy::new(retry),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// One POST to a search endpoint, no retries
    async fn search_once<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &SearchRequest,
    ) -> Result<SearchResponse<T>, LookupError> {
        if self.token.trim().is_empty() {
            return Err(LookupError::MissingToken);
        }

        let response = self
            .http
            .post(self.url(path))
            .header(AUTHORIZATION, authorization_value(&self.token))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = parse_rate_limit_reset(response.headers().get(RATE_LIMIT_RESET_HEADER));
            return Err(LookupError::RateLimited { reset_at });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn search<T: DeserializeOwned>(
        &self,
        label: &str,
        path: &str,
        body: SearchRequest,
    ) -> Result<SearchResponse<T>, LookupError> {
        self.retry
            .execute(label, || self.search_once::<T>(path, &body))
            .await
    }
}

#[async_trait]
impl ContactLookup for IntercomClient {
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<Contact>, LookupError> {
        let response: SearchResponse<Contact> = self
            .search(
                "contacts/search",
                CONTACTS_SEARCH_PATH,
                SearchRequest::field_equals("email", email),
            )
            .await?;

        let total_count = response.total_count.unwrap_or(0);
        if total_count == 0 {
            return Ok(None);
        }
        match response.data.into_iter().next() {
            Some(contact) => Ok(Some(contact)),
            None => Err(LookupError::EmptyResult { total_count }),
        }
    }

    async fn count_conversations_for_contact(
        &self,
        contact_id: &str,
    ) -> Result<Option<u64>, LookupError> {
        let response: SearchResponse<ConversationStub> = self
            .search(
                "conversations/search",
                CONVERSATIONS_SEARCH_PATH,
                SearchRequest::field_equals("contact_ids", contact_id),
            )
            .await?;

        Ok(response.total_count)
    }
}

/// Tokens are sent as `Bearer <token>` unless they already carry a scheme
fn authorization_value(token: &str) -> String {
    let token = token.trim();
    if token.to_lowercase().starts_with("bearer ") {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    }
}

/// `X-RateLimit-Reset` is a Unix timestamp in seconds
fn parse_rate_limit_reset(value: Option<&HeaderValue>) -> Option<DateTime<Utc>> {
    let secs = value?.to_str().ok()?.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned HTTP responses in order, recording each raw request
    async fn serve(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                seen.lock().unwrap().push(request);
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{}", addr), requests)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn json_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    fn rate_limited_response(reset: Option<i64>) -> String {
        let header = reset
            .map(|r| format!("X-RateLimit-Reset: {}\r\n", r))
            .unwrap_or_default();
        format!(
            "HTTP/1.1 429 Too Many Requests\r\n{}Content-Length: 0\r\nConnection: close\r\n\r\n",
            header
        )
    }

    fn client(base_url: &str, attempts: u32) -> IntercomClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        IntercomClient::with_http_client(
            http,
            base_url,
            "tok_123",
            RetryConfig {
                max_attempts: attempts,
                backoff_unit: Duration::ZERO,
            },
        )
    }

    #[test]
    fn test_authorization_value() {
        assert_eq!(authorization_value("abc"), "Bearer abc");
        assert_eq!(authorization_value("Bearer abc"), "Bearer abc");
        assert_eq!(authorization_value(" bearer abc "), "bearer abc");
    }

    #[test]
    fn test_parse_rate_limit_reset() {
        let value = HeaderValue::from_static("1704110400");
        let parsed = parse_rate_limit_reset(Some(&value)).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");

        let garbage = HeaderValue::from_static("soon");
        assert_eq!(parse_rate_limit_reset(Some(&garbage)), None);
        assert_eq!(parse_rate_limit_reset(None), None);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = IntercomClient::new("https://example.test/", "t", RetryConfig::none());
        assert_eq!(client.url(CONTACTS_SEARCH_PATH), "https://example.test/contacts/search");
    }

    #[tokio::test]
    async fn test_find_contact_sends_search_query() {
        let (base, requests) = serve(vec![json_response(
            r#"{"type":"list","total_count":1,"data":[{"id":"c-1","email":"a@x.com"}]}"#,
        )])
        .await;

        let contact = client(&base, 1).find_contact_by_email("a@x.com").await.unwrap();
        assert_eq!(contact.unwrap().id, "c-1");

        let requests = requests.lock().unwrap();
        let request = &requests[0];
        assert!(request.starts_with("POST /contacts/search"));
        assert!(request.to_lowercase().contains("authorization: bearer tok_123"));
        assert!(request.contains(r#""field":"email""#));
        assert!(request.contains(r#""value":"a@x.com""#));
    }

    #[tokio::test]
    async fn test_find_contact_no_match() {
        let (base, _) = serve(vec![json_response(r#"{"total_count":0,"data":[]}"#)]).await;
        let contact = client(&base, 1).find_contact_by_email("nobody@x.com").await.unwrap();
        assert!(contact.is_none());
    }

    #[tokio::test]
    async fn test_count_without_data_is_an_error() {
        let (base, _) = serve(vec![json_response(r#"{"total_count":2,"data":[]}"#)]).await;
        let result = client(&base, 1).find_contact_by_email("a@x.com").await;
        assert!(matches!(result, Err(LookupError::EmptyResult { total_count: 2 })));
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_succeeds() {
        let (base, requests) = serve(vec![
            rate_limited_response(Some(0)),
            rate_limited_response(None),
            json_response(r#"{"total_count":3,"conversations":[]}"#),
        ])
        .await;

        let count = client(&base, 5)
            .count_conversations_for_contact("c-1")
            .await
            .unwrap();
        assert_eq!(count, Some(3));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].starts_with("POST /conversations/search"));
        assert!(requests[2].contains(r#""field":"contact_ids""#));
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let (base, _) = serve(vec![rate_limited_response(None), rate_limited_response(None)]).await;

        let result = client(&base, 2).find_contact_by_email("a@x.com").await;
        assert!(matches!(result, Err(LookupError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let (base, requests) = serve(vec![
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom"
                .to_string(),
        ])
        .await;

        let result = client(&base, 5).find_contact_by_email("a@x.com").await;
        match result {
            Err(LookupError::Status { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_token_fails_fast() {
        let client = IntercomClient::new("http://127.0.0.1:9", "  ", RetryConfig::none());
        let result = client.find_contact_by_email("a@x.com").await;
        assert!(matches!(result, Err(LookupError::MissingToken)));
    }
}
