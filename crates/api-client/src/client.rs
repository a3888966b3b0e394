//! Main API client implementation

use crate::config::ClientConfig;
use crate::endpoints::MeetingsApi;
use crate::error::{ApiError, ApiResult};
use meetpoint_core::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig, retry_async};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// Whether a call may be repeated after a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Use the configured retry profile
    Configured,
    /// Exactly one attempt
    Once,
}

/// Meetpoint API client with built-in resilience patterns
///
/// This client wraps `reqwest` and adds:
/// - Bearer credential on every request
/// - Automatic retry with exponential backoff for idempotent calls
/// - Circuit breaker to prevent cascading failures
/// - Request correlation IDs for tracing
#[derive(Clone)]
pub struct MeetpointClient {
    inner: Client,
    config: Arc<ClientConfig>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl MeetpointClient {
    /// Create a new client with default configuration from environment
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("meetpoint-api-client/", env!("CARGO_PKG_VERSION"))),
        );

        if let Some(ref token) = config.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::config("bearer token contains invalid header characters"))?;
            value.set_sensitive(true);
            default_headers.insert(AUTHORIZATION, value);
        }

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        let circuit_breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));

        Ok(Self {
            inner,
            config: Arc::new(config),
            circuit_breaker,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get circuit breaker state
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Reset the circuit breaker
    pub fn reset_circuit(&self) {
        self.circuit_breaker.reset();
    }

    /// Access meeting location endpoints
    #[must_use]
    pub fn meetings(&self) -> MeetingsApi {
        MeetingsApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Low-level HTTP methods with resilience
    // -------------------------------------------------------------------------

    /// Perform a GET request with resilience patterns
    #[instrument(skip(self, query), fields(request_id))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        self.request(Method::GET, path, query, Option::<&()>::None, RetryPolicy::Configured)
            .await
    }

    /// Perform a POST request with resilience patterns
    #[instrument(skip(self, body), fields(request_id))]
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        policy: RetryPolicy,
    ) -> ApiResult<T> {
        self.request(Method::POST, path, &[], Some(body), policy).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Execute a request with full resilience patterns
    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        policy: RetryPolicy,
    ) -> ApiResult<T> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());
        let url = self.url(path);

        // Check circuit breaker
        if !self.circuit_breaker.can_execute() {
            warn!(
                request_id = %request_id,
                url = %url,
                "Circuit breaker is open, rejecting request"
            );
            return Err(ApiError::CircuitOpen);
        }

        let retry = match policy {
            RetryPolicy::Configured => self.config.retry.clone(),
            RetryPolicy::Once => RetryConfig::no_retry(),
        };

        self.execute_with_retry(&request_id, retry, method, &url, query, body)
            .await
    }

    /// Execute request with retry logic
    async fn execute_with_retry<T: DeserializeOwned, B: Serialize>(
        &self,
        request_id: &str,
        retry: RetryConfig,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ApiResult<T> {
        let operation = format!("{method} {url}");
        let outcome = retry_async(retry, &operation, ApiError::is_retryable, || {
            let method = method.clone();
            async move {
                let start = Instant::now();
                let result = self
                    .execute_single_request(request_id, method, url, query, body)
                    .await;
                match &result {
                    Ok(_) => self.circuit_breaker.record_success(),
                    Err(e) => {
                        self.circuit_breaker.record_failure();
                        debug!(
                            request_id = %request_id,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            error = %e,
                            "Request attempt failed"
                        );
                    }
                }
                result
            }
        })
        .await;

        match outcome {
            Ok(done) => {
                debug!(
                    request_id = %request_id,
                    attempts = done.attempts,
                    elapsed_ms = done.total_duration.as_millis() as u64,
                    "Request succeeded"
                );
                Ok(done.value)
            }
            Err(failure) if failure.exhausted && failure.attempts > 1 => {
                Err(ApiError::RetriesExhausted {
                    attempts: failure.attempts,
                    last_error: failure.last_error.to_string(),
                    transient: failure.last_error.is_retryable(),
                })
            }
            Err(failure) => Err(failure.into_inner()),
        }
    }

    /// Execute a single request without retry
    async fn execute_single_request<T: DeserializeOwned, B: Serialize>(
        &self,
        request_id: &str,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ApiResult<T> {
        let mut request = self
            .inner
            .request(method, url)
            .header(X_REQUEST_ID, request_id);

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(b) = body {
            request = request.json(b);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle HTTP response and deserialize
    async fn handle_response<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let status = response.status();

        if status.is_success() {
            let text = response.text().await?;
            // Empty bodies (204) deserialize as JSON null
            let text = if text.trim().is_empty() { "null" } else { text.as_str() };
            Ok(serde_json::from_str(text)?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ApiError::api_response(status.as_u16(), error_message(&message)))
        }
    }
}

/// Pull `error` or `message` out of a JSON error body, else keep the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Reject identifiers that would change the request path
pub(crate) fn path_segment(id: &str) -> ApiResult<&str> {
    if id.is_empty() || id.chars().any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace()) {
        return Err(ApiError::InvalidUrl(format!("invalid path segment: {id:?}")));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = ClientConfig::development().with_bearer_token("secret");
        let client = MeetpointClient::with_config(config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_token_is_config_error() {
        let config = ClientConfig::development().with_bearer_token("bad\ntoken");
        assert!(matches!(
            MeetpointClient::with_config(config),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn test_url_joining() {
        let client =
            MeetpointClient::with_config(ClientConfig::default().with_base_url("https://x.test/v1/"))
                .unwrap();
        assert_eq!(client.url("meetings/m1/suggestions"), "https://x.test/v1/meetings/m1/suggestions");
        assert_eq!(client.url("/meetings"), "https://x.test/v1/meetings");
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("m-42").unwrap(), "m-42");
        assert!(path_segment("").is_err());
        assert!(path_segment("../admin").is_err());
        assert!(path_segment("a b").is_err());
        assert!(path_segment("x?y=1").is_err());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":"Only the organizer can select"}"#), "Only the organizer can select");
        assert_eq!(error_message(r#"{"message":"nope"}"#), "nope");
        assert_eq!(error_message("  plain text \n"), "plain text");
    }

    #[test]
    fn test_open_circuit_rejects_without_network() {
        let client = MeetpointClient::with_config(ClientConfig::development()).unwrap();
        for _ in 0..CircuitBreakerConfig::default().failure_threshold {
            client.circuit_breaker.record_failure();
        }
        assert_eq!(client.circuit_state(), CircuitState::Open);

        let result: ApiResult<serde_json::Value> =
            tokio_test::block_on(client.get("meetings/m1/attendee-locations", &[]));
        assert!(matches!(result, Err(ApiError::CircuitOpen)));

        client.reset_circuit();
        assert_eq!(client.circuit_state(), CircuitState::Closed);
    }
}
