//! Test-automation client for the cars REST service.
//!
//! # Overview
//! Wraps the car, registration and user endpoints, composes them into
//! business-level test operations and tracks pass/fail outcomes for a run.
//!
//! # Design
//! - `Transport` executes plain-data `HttpRequest`s with bounded retries on a
//!   pooled agent and classifies failures into `ApiError`.
//! - Endpoint wrappers build requests and return a uniform
//!   `ResponseEnvelope`; they share one `Transport` by `Arc`.
//! - `ApiPlayer` sequences wrapper calls, decides pass/fail per operation and
//!   records outcomes in `Results`.
//! - `TestSession` is the explicit setup/teardown around a player.

pub mod auth;
pub mod config;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod http;
pub mod logging;
pub mod player;
pub mod results;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{header_details, AuthToken};
pub use config::{Credentials, Environment, RunConfig};
pub use endpoints::{CarsApi, RegistrationApi, UsersApi};
pub use envelope::ResponseEnvelope;
pub use error::{ApiError, ApiResult, ErrorKind};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse};
pub use player::{ApiPlayer, ValidationResult};
pub use results::{Results, RunSummary};
pub use session::TestSession;
pub use transport::{Executor, RetryPolicy, Transport, TransportConfig, UreqExecutor};
pub use types::{Car, CarQuery, CustomerDetails};
