//! Test orchestrator for the cars service.
//!
//! # Design
//! `ApiPlayer` owns one wrapper per resource group and the run's `Results`.
//! Every business operation goes through `execute` (or `execute_async`):
//! log the start, make the call, log the status, decide pass/fail with the
//! operation's success predicate, record it, log completion. Failures are
//! recorded, never raised. `check_validation_error` is the one operation
//! that consumes the transport's raising path, translating the typed error
//! into a status/message pair.
//!
//! The tracker sits behind a `Mutex` so async operations can run
//! concurrently against one player without losing updates.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::auth::{header_details, AuthToken};
use crate::config::{Credentials, Environment, RunConfig};
use crate::endpoints::{CarsApi, RegistrationApi, UsersApi};
use crate::envelope::ResponseEnvelope;
use crate::error::{ApiError, ApiResult};
use crate::http::Headers;
use crate::results::{Results, RunSummary};
use crate::transport::{Transport, TransportConfig};
use crate::types::{Car, CarQuery, CarsListBody, CustomerDetails, RegisterCarBody, RegisteredBody};

pub const MSG_AUTHORIZED: &str = "Successful authentication and access permission";
pub const MSG_FORBIDDEN: &str = "403 FORBIDDEN: Authentication successful but no access for non-admin users";
pub const MSG_UNAUTHORIZED: &str = "401 UNAUTHORIZED: Authenticate with proper credentials OR Require Basic Auth";
pub const MSG_NOT_FOUND: &str = "404 NOT FOUND: URL not found";

/// Outcome of `check_validation_error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub result_flag: bool,
    pub msg: String,
}

type SuccessPredicate = fn(&ResponseEnvelope) -> bool;

pub struct ApiPlayer {
    cars_api: CarsApi,
    registration_api: RegistrationApi,
    users_api: UsersApi,
    environment: Environment,
    results: Mutex<Results>,
}

impl ApiPlayer {
    pub fn new(base_url: &str, environment: Environment, transport: &TransportConfig) -> Self {
        Self::with_transport(Arc::new(Transport::new(transport)), base_url, environment)
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(&config.base_url, config.environment, &config.transport)
    }

    /// All wrappers share `transport` and therefore one connection pool.
    pub fn with_transport(transport: Arc<Transport>, base_url: &str, environment: Environment) -> Self {
        info!(base_url, %environment, "initializing api player");
        Self {
            cars_api: CarsApi::new(transport.clone(), base_url),
            registration_api: RegistrationApi::new(transport.clone(), base_url),
            users_api: UsersApi::new(transport, base_url),
            environment,
            results: Mutex::new(Results::new()),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn set_auth_details(&self, username: &str, password: &str) -> AuthToken {
        info!(username, "generating auth token");
        AuthToken::encode(&Credentials::new(username, password))
    }

    pub fn set_header_details(&self, auth: Option<&AuthToken>) -> Headers {
        if auth.is_some() {
            info!("creating authenticated headers");
        } else {
            info!("creating non-authenticated headers");
        }
        header_details(auth)
    }

    pub fn get_cars(&self, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("get_cars", &headers, None);
        self.execute("get_cars", || self.cars_api.get_cars(&headers), general_success)
    }

    pub fn get_car(&self, car_name: &str, brand: &str, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let query = CarQuery::new(car_name, brand);
        let headers = self.set_header_details(auth);
        log_parameters("get_car", &headers, Some(to_json(&query)));
        self.execute(
            &format!("get_car({car_name})"),
            || self.cars_api.get_car(&query, &headers),
            general_success,
        )
    }

    pub fn add_car(&self, car: &Car, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("add_car", &headers, Some(to_json(car)));
        self.execute("add_car", || self.cars_api.add_car(car, &headers), general_success)
    }

    pub fn update_car(&self, car: &Car, car_name: &str, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("update_car", &headers, Some(to_json(car)));
        self.execute(
            &format!("update_car({car_name})"),
            || self.cars_api.update_car(car_name, car, &headers),
            general_success,
        )
    }

    pub fn remove_car(&self, car_name: &str, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("remove_car", &headers, Some(to_json(&car_name)));
        self.execute(
            &format!("remove_car({car_name})"),
            || self.cars_api.remove_car(car_name, &headers),
            general_success,
        )
    }

    /// Success is read from `registered_car.successful`, not the top level.
    pub fn register_car(
        &self,
        car_name: &str,
        brand: &str,
        customer: &CustomerDetails,
        auth: Option<&AuthToken>,
    ) -> (bool, ResponseEnvelope) {
        let query = CarQuery::new(car_name, brand);
        let headers = self.set_header_details(auth);
        log_parameters("register_car", &headers, Some(to_json(&(&query, customer))));
        self.execute(
            &format!("register_car({car_name})"),
            || self.registration_api.register_car(&query, customer, &headers),
            registration_success,
        )
    }

    pub fn get_registered_cars(&self, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("get_registered_cars", &headers, None);
        self.execute(
            "get_registered_cars",
            || self.registration_api.get_registered_cars(&headers),
            general_success,
        )
    }

    /// Length of the `registered` collection; unknown shapes are errors.
    pub fn get_registered_car_count(&self, auth: Option<&AuthToken>) -> ApiResult<usize> {
        info!("getting registered car count");
        let (_, envelope) = self.get_registered_cars(auth);
        let body: RegisteredBody = envelope.decode()?;
        let count = body.registered.len();
        info!(count, "registered cars found");
        Ok(count)
    }

    pub fn delete_registered_car(&self, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("delete_registered_car", &headers, None);
        self.execute(
            "delete_registered_car",
            || self.registration_api.delete_registered_car(&headers),
            general_success,
        )
    }

    /// Not tracked. Failures come back in the envelope's `error` field.
    pub fn reset_app_state(&self, auth: Option<&AuthToken>) -> ResponseEnvelope {
        let headers = self.set_header_details(auth);
        log_parameters("reset_app_state", &headers, None);
        let envelope = self.cars_api.reset_app_state(&headers);
        match &envelope.error {
            Some(message) => error!(url = %envelope.url, "error resetting application state: {message}"),
            None => info!(status = ?envelope.status_code, "application state reset"),
        }
        envelope
    }

    /// Not tracked. The flag is `false` when the call produced an error.
    pub fn get_user_list(&self, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("get_user_list", &headers, None);
        let envelope = self.users_api.get_user_list(&headers);
        if let Some(message) = &envelope.error {
            error!(url = %envelope.url, "error fetching user list: {message}");
            return (false, envelope);
        }
        info!(status = ?envelope.status_code, "user list received");
        (true, envelope)
    }

    /// Length of `cars_list`; unknown shapes are errors, not zero.
    pub fn get_car_count(&self, auth: Option<&AuthToken>) -> ApiResult<usize> {
        info!("getting car count");
        let (_, envelope) = self.get_cars(auth);
        let body: CarsListBody = envelope.decode()?;
        let count = body.cars_list.len();
        info!(count, "cars found");
        Ok(count)
    }

    pub fn verify_car_count(&self, expected: usize, auth: Option<&AuthToken>) -> (bool, usize) {
        info!(expected, "verifying car count");
        let outcome = self.get_car_count(auth);
        self.verify_count("Car", expected, outcome)
    }

    pub fn verify_registration_count(&self, expected: usize, auth: Option<&AuthToken>) -> (bool, usize) {
        info!(expected, "verifying registered car count");
        let outcome = self.get_registered_car_count(auth);
        self.verify_count("Registered car", expected, outcome)
    }

    /// Classify access to the protected user listing. Not tracked.
    pub fn check_validation_error(&self, auth: Option<&AuthToken>) -> ValidationResult {
        info!("checking validation errors");
        let headers = self.set_header_details(auth);
        let result = classify_validation(self.users_api.fetch_user_list(&headers));
        info!(result_flag = result.result_flag, "validation check result: {}", result.msg);
        result
    }

    pub async fn async_get_cars(&self, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("async_get_cars", &headers, None);
        self.execute_async("async_get_cars", self.cars_api.get_cars_async(&headers), general_success)
            .await
    }

    pub async fn async_get_car(
        &self,
        car_name: &str,
        brand: &str,
        auth: Option<&AuthToken>,
    ) -> (bool, ResponseEnvelope) {
        let query = CarQuery::new(car_name, brand);
        let headers = self.set_header_details(auth);
        log_parameters("async_get_car", &headers, Some(to_json(&query)));
        self.execute_async(
            &format!("async_get_car({car_name})"),
            self.cars_api.get_car_async(&query, &headers),
            general_success,
        )
        .await
    }

    pub async fn async_add_car(&self, car: &Car, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("async_add_car", &headers, Some(to_json(car)));
        self.execute_async("async_add_car", self.cars_api.add_car_async(car, &headers), general_success)
            .await
    }

    pub async fn async_get_registered_cars(&self, auth: Option<&AuthToken>) -> (bool, ResponseEnvelope) {
        let headers = self.set_header_details(auth);
        log_parameters("async_get_registered_cars", &headers, None);
        self.execute_async(
            "async_get_registered_cars",
            self.registration_api.get_registered_cars_async(&headers),
            general_success,
        )
        .await
    }

    /// Snapshot of the tracker.
    pub fn results(&self) -> Results {
        self.lock_results().clone()
    }

    pub fn summary(&self) -> RunSummary {
        self.lock_results().summary()
    }

    pub fn write_summary(&self) {
        self.lock_results().write_summary();
    }

    fn execute<F>(&self, operation: &str, call: F, succeeded: SuccessPredicate) -> (bool, ResponseEnvelope)
    where
        F: FnOnce() -> ResponseEnvelope,
    {
        info!(operation, "starting operation");
        let envelope = call();
        self.settle(operation, envelope, succeeded)
    }

    async fn execute_async<Fut>(
        &self,
        operation: &str,
        call: Fut,
        succeeded: SuccessPredicate,
    ) -> (bool, ResponseEnvelope)
    where
        Fut: Future<Output = ResponseEnvelope>,
    {
        info!(operation, "starting operation");
        let envelope = call.await;
        self.settle(operation, envelope, succeeded)
    }

    fn settle(&self, operation: &str, envelope: ResponseEnvelope, succeeded: SuccessPredicate) -> (bool, ResponseEnvelope) {
        info!(operation, status = ?envelope.status_code, "received response");
        let result_flag = succeeded(&envelope);
        {
            let mut results = self.lock_results();
            if result_flag {
                results.success(&format!("Successfully executed {operation}"));
            } else {
                results.failure(&format!("Failed to execute {operation}"));
            }
        }
        info!(operation, result_flag, "completed operation");
        (result_flag, envelope)
    }

    fn verify_count(&self, what: &str, expected: usize, outcome: ApiResult<usize>) -> (bool, usize) {
        let mut results = self.lock_results();
        match outcome {
            Ok(actual) if actual == expected => {
                results.success(&format!("{what} count matches expected count"));
                (true, actual)
            }
            Ok(actual) => {
                results.failure(&format!(
                    "{what} count does not match: expected {expected}, got {actual}"
                ));
                (false, actual)
            }
            Err(err) => {
                results.failure(&format!("{what} count could not be determined: {err}"));
                (false, 0)
            }
        }
    }

    fn lock_results(&self) -> MutexGuard<'_, Results> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `response.successful == true` from a server that answered.
pub fn general_success(envelope: &ResponseEnvelope) -> bool {
    envelope.is_successful()
}

/// `response.registered_car.successful == true`; a missing object is `false`.
pub fn registration_success(envelope: &ResponseEnvelope) -> bool {
    envelope
        .decode::<RegisterCarBody>()
        .map(|body| body.successful())
        .unwrap_or(false)
}

/// Map the raising user-listing call onto the 200/403/401/404 table.
///
/// 403 is inferred from the body flag of an HTTP-level success, while 401 and
/// 404 come from real statuses; an actual HTTP 403 is an authentication error
/// and therefore reports as 401.
pub fn classify_validation(outcome: ApiResult<Value>) -> ValidationResult {
    let msg = match outcome {
        Ok(body) if body.get("successful").and_then(Value::as_bool) == Some(true) => {
            return ValidationResult {
                result_flag: true,
                msg: MSG_AUTHORIZED.to_string(),
            };
        }
        Ok(_) => MSG_FORBIDDEN.to_string(),
        Err(ApiError::Authentication { .. }) => MSG_UNAUTHORIZED.to_string(),
        Err(ApiError::NotFound(_)) => MSG_NOT_FOUND.to_string(),
        Err(err) => {
            error!("unexpected error while checking validation: {err}");
            err.to_string()
        }
    };
    ValidationResult {
        result_flag: false,
        msg,
    }
}

// Header values are left out; they may carry credentials.
fn log_parameters(operation: &str, headers: &Headers, payload: Option<String>) {
    let header_names: Vec<&str> = headers.iter().map(|(name, _)| name.as_str()).collect();
    let payload = payload.unwrap_or_default();
    info!(operation, headers = ?header_names, %payload, "request parameters");
}

fn to_json<T: Serialize + ?Sized>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{customer_details, figo};
    use crate::testing::{fast_policy, fixed_transport, json_response, refused, ScriptedExecutor};

    const BASE: &str = "http://localhost:5001";

    fn player(status: u16, body: &'static str) -> ApiPlayer {
        ApiPlayer::with_transport(fixed_transport(status, body), BASE, Environment::Staging)
    }

    fn token() -> AuthToken {
        AuthToken::encode(&Credentials::admin())
    }

    #[test]
    fn general_operations_pass_on_successful_flag() {
        let p = player(200, r#"{"successful":true}"#);
        let (flag, envelope) = p.add_car(&figo(), Some(&token()));
        assert!(flag);
        assert_eq!(envelope.status_code, Some(200));

        let p = player(200, r#"{"successful":false}"#);
        let (flag, _) = p.remove_car("figo", Some(&token()));
        assert!(!flag);
        assert_eq!(p.results().failures(), ["FAIL: Failed to execute remove_car(figo)".to_string()]);
    }

    #[test]
    fn registration_reads_nested_flag() {
        let p = player(200, r#"{"registered_car":{"successful":true}}"#);
        let (flag, _) = p.register_car("Swift", "Maruti", &customer_details(), Some(&token()));
        assert!(flag);

        let p = player(200, r#"{"registered_car":{"successful":false},"successful":true}"#);
        let (flag, _) = p.register_car("Swift", "Maruti", &customer_details(), Some(&token()));
        assert!(!flag);

        let p = player(200, r#"{"successful":true}"#);
        let (flag, _) = p.register_car("Swift", "Maruti", &customer_details(), Some(&token()));
        assert!(!flag);
        assert_eq!(p.results().fail_count(), 1);
    }

    #[test]
    fn verify_car_count_compares_list_length() {
        let body = r#"{"cars_list":[
            {"name":"Swift","brand":"Maruti","price_range":"3-5lacs","car_type":"hatchback"},
            {"name":"figo","brand":"Ford","price_range":"2-3lacs","car_type":"hatchback"}
        ],"successful":true,"count":99}"#;
        let p = player(200, body);
        assert_eq!(p.verify_car_count(2, Some(&token())), (true, 2));
        assert_eq!(p.verify_car_count(3, Some(&token())), (false, 2));

        let results = p.results();
        // Two get_cars calls plus two verifications.
        assert_eq!(results.total(), 4);
        assert_eq!(results.pass_count(), 3);
    }

    #[test]
    fn verify_count_on_unknown_shape_fails_without_panicking() {
        let p = player(200, r#"{"successful":true}"#);
        assert_eq!(p.verify_registration_count(0, Some(&token())), (false, 0));
        assert!(p.get_car_count(Some(&token())).is_err());
        assert!(p.results().failures().iter().any(|f| f.contains("could not be determined")));
    }

    #[test]
    fn validation_table() {
        let cases: [(u16, &'static str, bool, &str); 4] = [
            (200, r#"{"successful":true,"user_list":[]}"#, true, MSG_AUTHORIZED),
            (200, r#"{"successful":false}"#, false, MSG_FORBIDDEN),
            (401, r#"{"successful":false}"#, false, MSG_UNAUTHORIZED),
            (404, r#"{"successful":false}"#, false, MSG_NOT_FOUND),
        ];
        for (status, body, flag, msg) in cases {
            let result = player(status, body).check_validation_error(Some(&token()));
            assert_eq!(result.result_flag, flag, "status {status}");
            assert_eq!(result.msg, msg, "status {status}");
        }
    }

    #[test]
    fn validation_reports_other_errors_verbatim() {
        let result = player(400, "{}").check_validation_error(None);
        assert!(!result.result_flag);
        assert!(result.msg.starts_with("Request failed for GET"));
        // Not part of the tracker.
        assert_eq!(player(400, "{}").results().total(), 0);
    }

    #[test]
    fn header_shape_follows_token() {
        let executor = ScriptedExecutor::new(|_, _| Ok(json_response(200, r#"{"successful":true}"#)));
        let transport = Arc::new(Transport::with_executor(executor.clone(), fast_policy()));
        let p = ApiPlayer::with_transport(transport, BASE, Environment::Staging);

        p.get_cars(Some(&token()));
        p.get_cars(None);
        let requests = executor.requests();
        assert_eq!(requests[0].header("authorization"), Some("Basic cXhmMjpxeGYy"));
        assert_eq!(requests[0].header("content-type"), None);
        assert_eq!(requests[1].header("authorization"), None);
        assert_eq!(requests[1].header("content-type"), Some("application/json"));
    }

    #[test]
    fn user_list_and_reset_do_not_raise_on_connection_failure() {
        let executor = ScriptedExecutor::new(|_, req| Err(refused(req)));
        let transport = Arc::new(Transport::with_executor(executor, fast_policy()));
        let p = ApiPlayer::with_transport(transport, BASE, Environment::Staging);

        let (flag, envelope) = p.get_user_list(Some(&token()));
        assert!(!flag);
        assert_eq!(envelope.status_code, None);

        let envelope = p.reset_app_state(Some(&token()));
        assert!(envelope.error.is_some());
        assert_eq!(p.results().total(), 0);
    }

    #[tokio::test]
    async fn async_operations_match_sync_outcomes() {
        let p = player(200, r#"{"cars_list":[],"successful":true}"#);
        let (sync_flag, sync_envelope) = p.get_cars(None);
        let (async_flag, async_envelope) = p.async_get_cars(None).await;
        assert_eq!(sync_flag, async_flag);
        assert_eq!(sync_envelope, async_envelope);
        assert_eq!(p.results().pass_count(), 2);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn async_operations_log_their_parameters() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let p = player(200, r#"{"successful":true}"#);
        p.async_add_car(&figo(), Some(&token())).await;
        p.async_get_car("Swift", "Maruti", None).await;

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let logged: Vec<&str> = output.lines().filter(|l| l.contains("request parameters")).collect();
        assert_eq!(logged.len(), 2);
        assert!(logged[0].contains("async_add_car") && logged[0].contains("figo"));
        assert!(logged[1].contains("async_get_car") && logged[1].contains("Maruti"));
        // Header values never reach the log.
        assert!(!output.contains("cXhmMjpxeGYy"));
    }
}
