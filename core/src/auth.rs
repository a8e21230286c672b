//! Basic-auth token and request header construction.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::Credentials;
use crate::http::Headers;

/// Base64 of `username:password`. Built per test, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn encode(credentials: &Credentials) -> Self {
        Self(STANDARD.encode(format!("{}:{}", credentials.username, credentials.password)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Exactly one of two shapes: `Authorization` when a token is given,
/// `content-type` otherwise. Never both.
pub fn header_details(token: Option<&AuthToken>) -> Headers {
    match token {
        Some(token) => vec![("Authorization".to_string(), format!("Basic {}", token.as_str()))],
        None => vec![("content-type".to_string(), "application/json".to_string())],
    }
}
