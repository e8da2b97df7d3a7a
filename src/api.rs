//! Ticketing backend API client.
//!
//! Wraps `reqwest` with the conventions every resource endpoint shares:
//! base URL joining, `Authorization: Basic` header, JSON bodies, empty
//! success bodies decoded as `{}`, a bounded retry policy, and the error
//! taxonomy in [`ApiError`].

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, RetryPolicy};

/// Header carrying the per-call idempotency key on mutating requests.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Endpoint used to validate credentials.
pub const AUTH_PROBE_PATH: &str = "/Service/Editable";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The connection was never established; the request did not leave.
    Connect,
    Timeout,
    Other,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Transport {
        kind: TransportKind,
        message: String,
    },
    #[error("{message} (HTTP {status})")]
    Status {
        status: u16,
        message: String,
        body: String,
    },
    #[error("Invalid response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    /// 401/403 responses: credentials rejected or not allowed.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == 401 || *status == 403)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn retryable(&self, method: &Method) -> bool {
        let idempotent = *method == Method::GET;
        match self {
            ApiError::Transport { kind, .. } => idempotent || *kind == TransportKind::Connect,
            ApiError::Status { status, .. } => idempotent && *status >= 500,
            _ => false,
        }
    }
}

/// Convert a `reqwest::Error` into a user-friendly transport error.
fn transport_error(url: &str, err: &reqwest::Error) -> ApiError {
    if err.is_connect() {
        return ApiError::Transport {
            kind: TransportKind::Connect,
            message: format!("Cannot reach ticketing backend at {url}"),
        };
    }
    if err.is_timeout() {
        return ApiError::Transport {
            kind: TransportKind::Timeout,
            message: format!("Connection to {url} timed out"),
        };
    }
    if err.is_builder() {
        return ApiError::Validation(format!("Invalid backend URL: {url}"));
    }
    ApiError::Transport {
        kind: TransportKind::Other,
        message: format!("Network error communicating with {url}: {err}"),
    }
}

/// Convert an HTTP status code into a user-friendly message.
fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "Request rejected by backend".to_string(),
        401 => "Credentials are invalid or expired".to_string(),
        403 => "Access denied".to_string(),
        404 => "Backend endpoint not found".to_string(),
        s if s >= 500 => "Ticketing backend server error".to_string(),
        _ => "Unexpected response from ticketing backend".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Basic auth helpers
// ---------------------------------------------------------------------------

/// Encode `username:password` as a Basic auth token.
pub fn basic_token(username: &str, password: &str) -> String {
    BASE64_STANDARD.encode(format!("{username}:{password}"))
}

/// Recover the username from a Basic token.
pub fn username_from_token(token: &str) -> Option<String> {
    let decoded = BASE64_STANDARD.decode(token.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, _) = text.split_once(':')?;
    let user = user.trim();
    (!user.is_empty()).then(|| user.to_string())
}

// ---------------------------------------------------------------------------
// Decoding helpers
// ---------------------------------------------------------------------------

/// Decode a response body against a resource schema.
pub fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

/// Like [`decode`], but an empty body (`{}` or `null`) yields `None`.
pub fn decode_optional<T: DeserializeOwned>(
    path: &str,
    value: Value,
) -> Result<Option<T>, ApiError> {
    let empty = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Ok(None);
    }
    decode(path, value).map(Some)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ApiClient {
    http: Client,
    base: String,
    retry: RetryPolicy,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Validation(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base: crate::config::normalize_base_url(&config.api_base),
            retry: config.retry.clone(),
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.request_value(Method::GET, path, None).await?;
        decode(path, value)
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        let body = to_body(body)?;
        self.request_value(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        let body = to_body(body)?;
        self.request_value(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request_value(Method::DELETE, path, None).await
    }

    /// Validate a token against the backend without installing it.
    pub async fn probe(&self, token: &str) -> Result<(), ApiError> {
        let url = format!("{}{}", self.base, AUTH_PROBE_PATH);
        self.send_once(&Method::GET, &url, None, Some(token), None)
            .await
            .map(|_| ())
    }

    /// Perform a request with the installed token, applying the retry policy.
    ///
    /// `path` includes the leading slash, e.g. `/Order/Range?dtBegin=..`.
    pub async fn request_value(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base, path);
        let token = self.token();
        let idempotency_key = (method != Method::GET).then(|| Uuid::new_v4().to_string());
        let max_attempts = self.retry.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            let result = self
                .send_once(
                    &method,
                    &url,
                    body.as_ref(),
                    token.as_deref(),
                    idempotency_key.as_deref(),
                )
                .await;
            match result {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && err.retryable(&method) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        %method,
                        path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "backend request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut req = self.http.request(method.clone(), url);
        if let Some(token) = token {
            req = req.header("Authorization", format!("Basic {token}"));
        }
        if let Some(key) = idempotency_key {
            req = req.header(IDEMPOTENCY_HEADER, key);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(|e| transport_error(&self.base, &e))?;
        let status = resp.status();
        let body_text = resp
            .text()
            .await
            .map_err(|e| transport_error(&self.base, &e))?;

        if !status.is_success() {
            let body = body_text.trim().to_string();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|json| {
                    json.get("message")
                        .or_else(|| json.get("Message"))
                        .or_else(|| json.get("error"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| status_message(status));
            debug!(%method, url, status = status.as_u16(), body = %body, "backend returned error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
                body,
            });
        }

        if body_text.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&body_text).map_err(|source| ApiError::Decode {
            path: url.to_string(),
            source,
        })
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::Validation(format!("Failed to encode request body: {e}")))
}

/// Log a failed call with its context and hand the error back unchanged.
pub(crate) fn log_failure(operation: &str, err: &ApiError) {
    match err {
        ApiError::Status { status, body, .. } => {
            warn!(operation, status, body = %body, error = %err, "backend call failed")
        }
        _ => warn!(operation, error = %err, "backend call failed"),
    }
}

/// Log a successful mutation.
pub(crate) fn log_success(operation: &str) {
    info!(operation, "backend call succeeded");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{refused_config, CannedServer};

    #[test]
    fn basic_token_round_trips_username() {
        let token = basic_token("cashier", "s3cret:with:colons");
        assert_eq!(token, BASE64_STANDARD.encode("cashier:s3cret:with:colons"));
        assert_eq!(username_from_token(&token).as_deref(), Some("cashier"));
        assert_eq!(username_from_token("not base64!"), None);
    }

    #[test]
    fn decode_optional_treats_empty_object_as_none() {
        let parsed: Option<Vec<i32>> = decode_optional("/x", serde_json::json!({})).unwrap();
        assert!(parsed.is_none());
        let parsed: Option<Vec<i32>> = decode_optional("/x", serde_json::json!([1, 2])).unwrap();
        assert_eq!(parsed, Some(vec![1, 2]));
    }

    #[test]
    fn only_get_retries_server_errors() {
        let err = ApiError::Status {
            status: 503,
            message: "down".into(),
            body: String::new(),
        };
        assert!(err.retryable(&Method::GET));
        assert!(!err.retryable(&Method::POST));

        let timeout = ApiError::Transport {
            kind: TransportKind::Timeout,
            message: "slow".into(),
        };
        assert!(timeout.retryable(&Method::GET));
        assert!(!timeout.retryable(&Method::PUT));

        let refused = ApiError::Transport {
            kind: TransportKind::Connect,
            message: "refused".into(),
        };
        assert!(refused.retryable(&Method::DELETE));
    }

    #[tokio::test]
    async fn sends_basic_header_and_decodes_empty_body() {
        let server = CannedServer::start(vec![(200, String::new())]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        client.set_token(Some("dG9rZW4=".into()));

        let value = client.delete("/Users/Delete/7").await.unwrap();
        assert_eq!(value, serde_json::json!({}));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "DELETE");
        assert_eq!(requests[0].path, "/api/Users/Delete/7");
        assert_eq!(requests[0].header("authorization"), Some("Basic dG9rZW4="));
        assert!(requests[0].header("idempotency-key").is_some());
    }

    #[tokio::test]
    async fn non_success_status_carries_code_and_body() {
        let server = CannedServer::start(vec![(400, r#"{"message":"ServiceName required"}"#.into())]).await;
        let client = ApiClient::new(&server.config()).unwrap();

        let err = client
            .post("/Service/Create", &serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, message, body } => {
                assert_eq!(status, 400);
                assert_eq!(message, "ServiceName required");
                assert!(body.contains("ServiceName"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_is_a_decode_error() {
        let server = CannedServer::start(vec![(200, "<html>".into())]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        let err = client.get::<Value>("/Version/Info").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn get_retries_server_errors_then_succeeds() {
        let server = CannedServer::start(vec![
            (502, String::new()),
            (200, r#"{"Version":"2.1"}"#.into()),
        ])
        .await;
        let client = ApiClient::new(&server.config()).unwrap();
        let value: Value = client.get("/Version/Info").await.unwrap();
        assert_eq!(value["Version"], "2.1");
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn post_is_not_retried_after_server_error() {
        let server = CannedServer::start(vec![(500, String::new()), (200, "{}".into())]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        let err = client
            .post("/Order/Sold", &serde_json::json!({"OrderId": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let client = ApiClient::new(&refused_config()).unwrap();
        let err = client.get::<Value>("/Users").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }), "{err:?}");
    }
}
