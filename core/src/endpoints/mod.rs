//! Endpoint wrappers, one per resource group of the cars service.
//!
//! # Design
//! Each wrapper holds an `Endpoint`: the shared `Transport`, the base URL and
//! its resource segment. Every operation is split into a `build_*` method that
//! produces an `HttpRequest` and an executing method that sends it through the
//! transport's non-raising path and returns the `ResponseEnvelope` unmodified.
//! Wrappers carry no business logic and never interpret bodies.

pub mod cars;
pub mod registration;
pub mod users;

use std::sync::Arc;

use serde::Serialize;

use crate::envelope::ResponseEnvelope;
use crate::error::{ApiError, ApiResult};
use crate::http::HttpRequest;
use crate::transport::Transport;

pub use cars::CarsApi;
pub use registration::RegistrationApi;
pub use users::UsersApi;

/// Resource path prefix plus a handle on the shared transport.
#[derive(Debug, Clone)]
pub struct Endpoint {
    transport: Arc<Transport>,
    base_url: String,
    segment: &'static str,
}

impl Endpoint {
    pub fn new(transport: Arc<Transport>, base_url: &str, segment: &'static str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            segment,
        }
    }

    /// `{base}/{segment}{suffix}`
    pub fn url(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.base_url, self.segment, suffix)
    }

    /// `{base}/{segment}/{action}/{id}` with `id` percent-encoded as one
    /// path segment.
    pub fn item_url(&self, action: &str, id: &str) -> String {
        self.url(&format!("/{action}/{}", urlencoding::encode(id)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn call(&self, request: &HttpRequest) -> ResponseEnvelope {
        let (response, error) = self.transport.request(request);
        ResponseEnvelope::format(&request.url, response, error)
    }

    pub async fn call_async(&self, request: HttpRequest) -> ResponseEnvelope {
        let url = request.url.clone();
        let (response, error) = self.transport.request_async(request).await;
        ResponseEnvelope::format(&url, response, error)
    }

    /// Execute a request whose construction may have failed.
    pub fn call_built(&self, url: String, built: ApiResult<HttpRequest>) -> ResponseEnvelope {
        match built {
            Ok(request) => self.call(&request),
            Err(err) => ResponseEnvelope::format(&url, None, Some(err)),
        }
    }

    pub async fn call_built_async(&self, url: String, built: ApiResult<HttpRequest>) -> ResponseEnvelope {
        match built {
            Ok(request) => self.call_async(request).await,
            Err(err) => ResponseEnvelope::format(&url, None, Some(err)),
        }
    }
}

pub(crate) fn json_body<T: Serialize>(payload: &T) -> ApiResult<String> {
    serde_json::to_string(payload)
        .map_err(|e| ApiError::Validation(format!("request payload could not be encoded: {e}")))
}
