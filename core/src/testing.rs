//! In-memory executor for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{ApiError, ApiResult};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Executor, RetryPolicy, Transport};

/// Answers each call with `respond(call_index, request)` and records requests.
pub struct ScriptedExecutor<F> {
    calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
    respond: F,
}

impl<F> ScriptedExecutor<F>
where
    F: Fn(usize, &HttpRequest) -> ApiResult<HttpResponse> + Send + Sync + 'static,
{
    pub fn new(respond: F) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            respond,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl<F> Executor for ScriptedExecutor<F>
where
    F: Fn(usize, &HttpRequest) -> ApiResult<HttpResponse> + Send + Sync + 'static,
{
    fn execute(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(n, request)
    }
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        backoff_base: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

pub fn json_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string(),
    }
}

pub fn refused(request: &HttpRequest) -> ApiError {
    ApiError::Connection {
        method: request.method,
        url: request.url.clone(),
        message: "connection refused".to_string(),
    }
}

/// Transport answering every request with the same status and body.
pub fn fixed_transport(status: u16, body: &'static str) -> Arc<Transport> {
    let executor = ScriptedExecutor::new(move |_, _| Ok(json_response(status, body)));
    Arc::new(Transport::with_executor(executor, fast_policy()))
}
