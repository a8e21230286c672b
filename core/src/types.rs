//! Payloads and response bodies of the cars service.
//!
//! # Design
//! Bodies are decoded into these structs instead of being probed as loose
//! JSON maps, so a body of the wrong shape surfaces as a validation error
//! rather than as an empty list or a zero count. Fields the service may omit
//! are `Option` or `#[serde(default)]`; everything else is required.

use serde::{Deserialize, Serialize};

/// A car as stored by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Car {
    pub name: String,
    pub brand: String,
    pub price_range: String,
    pub car_type: String,
}

impl Car {
    pub fn matches(&self, name: &str, brand: &str) -> bool {
        self.name == name && self.brand == brand
    }
}

/// Query parameters identifying a car by name and brand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarQuery {
    pub car_name: String,
    pub brand: String,
}

impl CarQuery {
    pub fn new(car_name: &str, brand: &str) -> Self {
        Self {
            car_name: car_name.to_string(),
            brand: brand.to_string(),
        }
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("car_name".to_string(), self.car_name.clone()),
            ("brand".to_string(), self.brand.clone()),
        ]
    }
}

/// Customer attached to a registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerDetails {
    pub customer_name: String,
    pub city: String,
}

/// One entry of the registration listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub car: Car,
    pub customer_details: CustomerDetails,
    #[serde(default)]
    pub registration_token: Option<String>,
}

/// The nested object returned by `POST /register/car`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisteredCar {
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub car: Option<Car>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub registration_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: u32,
    pub name: String,
    pub perm: String,
}

/// Payload for `POST /users/add` and `PUT /users/update/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub password: String,
    pub perm: String,
}

/// `GET /cars`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarsListBody {
    pub cars_list: Vec<Car>,
    pub successful: bool,
}

impl CarsListBody {
    pub fn find(&self, name: &str, brand: &str) -> Option<&Car> {
        self.cars_list.iter().find(|car| car.matches(name, brand))
    }
}

/// `GET /cars/find`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarBody {
    pub car: Car,
    pub successful: bool,
}

/// `GET /register` and `GET /register/list`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisteredBody {
    pub registered: Vec<Registration>,
    pub successful: bool,
}

/// `POST /register/car`; success lives one level down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterCarBody {
    #[serde(default)]
    pub registered_car: Option<RegisteredCar>,
}

impl RegisterCarBody {
    pub fn successful(&self) -> bool {
        self.registered_car.as_ref().is_some_and(|car| car.successful)
    }
}

/// `GET /users`. Non-admin callers get `successful: false` and no list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserListBody {
    #[serde(default)]
    pub user_list: Option<Vec<User>>,
    pub successful: bool,
}

/// Generic `{successful, response?}` acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusBody {
    pub successful: bool,
    #[serde(default)]
    pub response: Option<String>,
}
