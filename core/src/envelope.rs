//! The uniform response envelope returned by every endpoint wrapper call.
//!
//! # Design
//! The wire shape is fixed to `{url, response, error, status_code}`. Exactly
//! one of `response` and `error` is populated; `status_code` is `None` only
//! when the server was never reached. The typed `ErrorKind` from the
//! transport's classification rides along outside the serialized shape so
//! callers can still branch on it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ErrorKind};
use crate::http::HttpResponse;

pub const INVALID_JSON: &str = "Invalid JSON response";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub url: String,
    pub response: Option<Value>,
    pub error: Option<String>,
    pub status_code: Option<u16>,
    #[serde(skip)]
    pub kind: Option<ErrorKind>,
}

impl ResponseEnvelope {
    /// Normalize the outcome of the transport's non-raising path.
    pub fn format(url: &str, response: Option<HttpResponse>, error: Option<ApiError>) -> Self {
        let Some(response) = response else {
            let kind = error.as_ref().map(ApiError::kind);
            return Self {
                url: url.to_string(),
                response: None,
                error: Some(
                    error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "No response received".to_string()),
                ),
                status_code: None,
                kind,
            };
        };

        let status_code = Some(response.status);
        match serde_json::from_str::<Value>(&response.body) {
            Err(_) => Self {
                url: url.to_string(),
                response: None,
                error: Some(INVALID_JSON.to_string()),
                status_code,
                kind: Some(ErrorKind::ValidationFailure),
            },
            Ok(_) if error.is_some() => {
                let kind = error.as_ref().map(ApiError::kind);
                Self {
                    url: url.to_string(),
                    response: None,
                    error: error.map(|e| e.to_string()),
                    status_code,
                    kind,
                }
            }
            Ok(body) => Self {
                url: url.to_string(),
                response: Some(body),
                error: None,
                status_code,
                kind: None,
            },
        }
    }

    /// `response.successful == true` with the server having answered.
    pub fn is_successful(&self) -> bool {
        self.status_code.is_some() && self.flag("successful")
    }

    /// Boolean field of the body; absent or non-boolean reads as `false`.
    pub fn flag(&self, field: &str) -> bool {
        self.response
            .as_ref()
            .and_then(|body| body.get(field))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Decode the body into a typed service response.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = self.response.as_ref().ok_or_else(|| {
            ApiError::Validation(format!(
                "no response body from {}: {}",
                self.url,
                self.error.as_deref().unwrap_or("empty response")
            ))
        })?;
        serde_json::from_value(body.clone())
            .map_err(|e| ApiError::Validation(format!("unexpected body from {}: {e}", self.url)))
    }
}
