//! Transport client: retries, connection pooling and failure classification.
//!
//! # Design
//! `Executor` performs exactly one HTTP round-trip and nothing else. The
//! production `UreqExecutor` runs on one pooled `ureq::Agent`, so every
//! wrapper sharing a `Transport` shares its connections. `Transport` layers
//! the retry policy and status classification on top and exposes two calling
//! conventions:
//!
//! - `request` never fails; it returns the response and/or the classified
//!   error for the caller to fold into a `ResponseEnvelope`.
//! - `send` / `request_json` return `Err(ApiError)` for anything that is not
//!   a 2xx answer.
//!
//! The `*_async` variants run the same code on tokio's blocking pool, so their
//! results are identical to the synchronous calls.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::INVALID_JSON;
use crate::error::{classify_status, ApiError, ApiResult};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Bounded exponential-backoff retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            retryable_status_codes: [429, 500, 502, 503, 504].into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Pause before retry number `retry` (0-based): base, 2*base, 4*base, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Status-driven retries replay only idempotent methods.
    pub fn should_retry_status(&self, method: HttpMethod, status: u16) -> bool {
        method.is_idempotent() && self.retryable_status_codes.contains(&status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Idle connections kept per host and in total.
    pub pool_size: usize,
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            pool_size: DEFAULT_POOL_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// One HTTP round-trip. Non-2xx statuses are returned as data, not errors.
pub trait Executor: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> ApiResult<HttpResponse>;
}

/// `Executor` backed by a pooled blocking `ureq` agent.
#[derive(Clone)]
pub struct UreqExecutor {
    agent: ureq::Agent,
}

impl UreqExecutor {
    pub fn new(config: &TransportConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .max_idle_connections(config.pool_size)
            .max_idle_connections_per_host(config.pool_size)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Executor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        let result = match request.method {
            HttpMethod::Get => decorate(self.agent.get(&request.url), request).call(),
            HttpMethod::Delete => decorate(self.agent.delete(&request.url), request).call(),
            HttpMethod::Post => send_body(decorate(self.agent.post(&request.url), request), request),
            HttpMethod::Put => send_body(decorate(self.agent.put(&request.url), request), request),
        };
        let mut response = result.map_err(|e| transport_error(request, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), value.to_str().unwrap_or("<binary>").to_string())
            })
            .collect();
        // A body cut short is a network failure; undecodable bytes are left
        // for JSON parsing to reject.
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| transport_error(request, e))?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn decorate<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (key, value) in &request.query {
        builder = builder.query(key, value);
    }
    builder
}

fn send_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match request.body.as_deref() {
        Some(body) if request.header("content-type").is_none() => {
            builder.content_type("application/json").send(body.as_bytes())
        }
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn transport_error(request: &HttpRequest, error: ureq::Error) -> ApiError {
    match error {
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => {
            ApiError::Unexpected(format!("{} {}: {error}", request.method, request.url))
        }
        other => ApiError::Connection {
            method: request.method,
            url: request.url.clone(),
            message: other.to_string(),
        },
    }
}

/// Shared HTTP client. Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct Transport {
    executor: Arc<dyn Executor>,
    policy: RetryPolicy,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(config: &TransportConfig) -> Self {
        Self::with_executor(Arc::new(UreqExecutor::new(config)), config.retry.clone())
    }

    pub fn with_executor(executor: Arc<dyn Executor>, policy: RetryPolicy) -> Self {
        Self { executor, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Non-raising path. A response is returned whenever the server answered;
    /// the error is set for connection failures and non-2xx statuses.
    pub fn request(&self, request: &HttpRequest) -> (Option<HttpResponse>, Option<ApiError>) {
        match self.execute_with_retry(request) {
            Ok(response) if response.is_success() => (Some(response), None),
            Ok(response) => {
                let err = classify_status(request.method, &request.url, response.status, &response.body);
                warn!(method = %request.method, url = %request.url, kind = ?err.kind(), "{err}");
                (Some(response), Some(err))
            }
            Err(err) => {
                warn!(method = %request.method, url = %request.url, kind = ?err.kind(), "{err}");
                (None, Some(err))
            }
        }
    }

    /// Raising path: anything but a 2xx answer becomes `Err`.
    pub fn send(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        let response = self.execute_with_retry(request)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(classify_status(request.method, &request.url, response.status, &response.body))
        }
    }

    /// Check status (and optionally an exact expected status) and parse JSON.
    pub fn handle_response(
        request: &HttpRequest,
        response: HttpResponse,
        expected_status: Option<u16>,
    ) -> ApiResult<Value> {
        if !response.is_success() {
            return Err(classify_status(request.method, &request.url, response.status, &response.body));
        }
        if let Some(expected) = expected_status {
            if response.status != expected {
                return Err(ApiError::Unexpected(format!(
                    "Expected status {expected} but got {}",
                    response.status
                )));
            }
        }
        serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Validation(format!("{INVALID_JSON} from {}: {e}", request.url)))
    }

    pub fn request_json(&self, request: &HttpRequest) -> ApiResult<Value> {
        let response = self.send(request)?;
        Self::handle_response(request, response, None)
    }

    pub async fn request_async(&self, request: HttpRequest) -> (Option<HttpResponse>, Option<ApiError>) {
        let transport = self.clone();
        let (method, url) = (request.method, request.url.clone());
        match tokio::task::spawn_blocking(move || transport.request(&request)).await {
            Ok(outcome) => outcome,
            Err(e) => (None, Some(worker_failed(method, &url, e))),
        }
    }

    pub async fn send_async(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let transport = self.clone();
        let (method, url) = (request.method, request.url.clone());
        tokio::task::spawn_blocking(move || transport.send(&request))
            .await
            .map_err(|e| worker_failed(method, &url, e))?
    }

    pub async fn request_json_async(&self, request: HttpRequest) -> ApiResult<Value> {
        let transport = self.clone();
        let (method, url) = (request.method, request.url.clone());
        tokio::task::spawn_blocking(move || transport.request_json(&request))
            .await
            .map_err(|e| worker_failed(method, &url, e))?
    }

    fn execute_with_retry(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(method = %request.method, url = %request.url, attempt, "sending request");
            match self.executor.execute(request) {
                Ok(response)
                    if attempt < max_attempts
                        && self.policy.should_retry_status(request.method, response.status) =>
                {
                    warn!(url = %request.url, status = response.status, attempt, "retryable status");
                }
                Ok(response) => {
                    debug!(url = %request.url, status = response.status, attempt, "response received");
                    return Ok(response);
                }
                Err(err) if err.is_connection() && attempt < max_attempts => {
                    warn!(url = %request.url, attempt, "{err}");
                }
                Err(err) => return Err(err),
            }
            thread::sleep(self.policy.delay_for(attempt - 1));
            attempt += 1;
        }
    }
}

fn worker_failed(method: HttpMethod, url: &str, error: tokio::task::JoinError) -> ApiError {
    ApiError::Unexpected(format!("{method} {url}: request worker failed: {error}"))
}
