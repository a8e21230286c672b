//! Error taxonomy for the cars API client.
//!
//! # Design
//! Every way a request can fail collapses into one `ApiError` variant so the
//! orchestration layer can branch on the kind of failure without matching on
//! message text. HTTP statuses map 1:1 onto variants (see `classify_status`);
//! transport-level failures become `Connection`; anything the client cannot
//! place lands in `Unexpected` with the original message.

use serde_json::Value;
use thiserror::Error;

use crate::http::HttpMethod;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised by the transport's raising path and by typed decoding.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never reached the server (refused, DNS, timeout).
    #[error("Connection error for {method} {url}: {message}")]
    Connection {
        method: HttpMethod,
        url: String,
        message: String,
    },

    /// The server answered with a non-2xx status not covered below.
    #[error("{message}")]
    Request {
        message: String,
        status: Option<u16>,
        body: Option<Value>,
    },

    /// A body or payload did not have the expected shape.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// HTTP 401 or 403.
    #[error("{message}")]
    Authentication { message: String, status: u16 },

    /// HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// HTTP 429.
    #[error("{0}")]
    RateLimited(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Field-less mirror of `ApiError`, cheap to copy into envelopes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConnectionFailure,
    RequestFailure,
    ValidationFailure,
    AuthenticationFailure,
    NotFound,
    RateLimited,
    Unexpected,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Connection { .. } => ErrorKind::ConnectionFailure,
            ApiError::Request { .. } => ErrorKind::RequestFailure,
            ApiError::Validation(_) => ErrorKind::ValidationFailure,
            ApiError::Authentication { .. } => ErrorKind::AuthenticationFailure,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::RateLimited(_) => ErrorKind::RateLimited,
            ApiError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Status code carried by the error, if the server was reached.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request { status, .. } => *status,
            ApiError::Authentication { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Whether this failure happened below HTTP and may be retried.
    pub fn is_connection(&self) -> bool {
        matches!(self, ApiError::Connection { .. })
    }
}

/// Map a non-2xx status onto the taxonomy.
///
/// `body` is parsed as JSON when possible and attached to `Request` errors.
pub fn classify_status(method: HttpMethod, url: &str, status: u16, body: &str) -> ApiError {
    match status {
        401 => ApiError::Authentication {
            message: format!("Authentication failed for {method} {url}"),
            status,
        },
        403 => ApiError::Authentication {
            message: format!("Access forbidden for {method} {url}"),
            status,
        },
        404 => ApiError::NotFound(format!("Resource not found at {method} {url}")),
        429 => ApiError::RateLimited(format!("Rate limit exceeded for {method} {url}")),
        s if s >= 500 => ApiError::Request {
            message: format!("Server error for {method} {url}"),
            status: Some(s),
            body: serde_json::from_str(body).ok(),
        },
        s => ApiError::Request {
            message: format!("Request failed for {method} {url}"),
            status: Some(s),
            body: serde_json::from_str(body).ok(),
        },
    }
}
