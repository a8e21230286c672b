//! Environment, credentials and run configuration.
//!
//! Values resolve per environment from static tables; `RunConfig::from_env`
//! lets `CARS_API_ENV` pick the environment and `CARS_API_BASE_URL` point the
//! run at another host.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::transport::TransportConfig;
use crate::types::{Car, CarQuery, CustomerDetails};

pub const ENV_VAR: &str = "CARS_API_ENV";
pub const BASE_URL_VAR: &str = "CARS_API_BASE_URL";

const LOCAL_BASE_URL: &str = "http://127.0.0.1:5001";
const HOSTED_BASE_URL: &str = "https://cars-app.qxf2.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Staging,
    Production,
    Uat,
    Development,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Staging | Environment::Development => LOCAL_BASE_URL,
            Environment::Production | Environment::Uat => HOSTED_BASE_URL,
        }
    }
}

impl FromStr for Environment {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            "uat" => Ok(Environment::Uat),
            "dev" | "development" => Ok(Environment::Development),
            other => Err(ApiError::Validation(format!("unknown environment `{other}`"))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Uat => "uat",
            Environment::Development => "development",
        };
        f.write_str(name)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Passwords stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Staging => Self::admin(),
            Environment::Production => Self::new("admin", "admin123"),
            Environment::Development => Self::new("dev", "dev123"),
            Environment::Uat => Self::non_admin(),
        }
    }

    /// Admin account used for setup and teardown.
    pub fn admin() -> Self {
        Self::new("qxf2", "qxf2")
    }

    pub fn non_admin() -> Self {
        Self::new("eric", "testqxf2")
    }

    /// Credentials the service does not know.
    pub fn invalid() -> Self {
        Self::new("unknown", "unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub environment: Environment,
    pub base_url: String,
    pub credentials: Credentials,
    pub transport: TransportConfig,
}

impl RunConfig {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            base_url: environment.base_url().to_string(),
            credentials: Credentials::for_environment(environment),
            transport: TransportConfig::default(),
        }
    }

    /// Resolve from `CARS_API_ENV` (default staging) and `CARS_API_BASE_URL`.
    pub fn from_env() -> Result<Self, ApiError> {
        let environment = match std::env::var(ENV_VAR) {
            Ok(name) => name.parse()?,
            Err(_) => Environment::default(),
        };
        let mut config = Self::for_environment(environment);
        if let Ok(url) = std::env::var(BASE_URL_VAR) {
            config.base_url = url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

/// Car added by the add-car scenario.
pub fn figo() -> Car {
    Car {
        name: "figo".to_string(),
        brand: "Ford".to_string(),
        price_range: "2-3lacs".to_string(),
        car_type: "hatchback".to_string(),
    }
}

/// Update payload for the figo car.
pub fn figo_update() -> Car {
    Car {
        price_range: "5-10lacs".to_string(),
        ..figo()
    }
}

/// Car looked up and registered by the registration scenarios.
pub fn swift() -> CarQuery {
    CarQuery::new("Swift", "Maruti")
}

pub fn customer_details() -> CustomerDetails {
    CustomerDetails {
        customer_name: "Rohit".to_string(),
        city: "BLR".to_string(),
    }
}
