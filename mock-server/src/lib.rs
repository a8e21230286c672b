use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Car {
    pub name: String,
    pub brand: String,
    pub price_range: String,
    pub car_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerDetails {
    pub customer_name: String,
    pub city: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registration {
    pub car: Car,
    pub customer_details: CustomerDetails,
    pub registration_token: Uuid,
}

#[derive(Clone, Debug)]
pub struct Account {
    pub user_id: u32,
    pub name: String,
    pub password: String,
    pub perm: String,
}

#[derive(Serialize)]
struct UserView<'a> {
    user_id: u32,
    name: &'a str,
    perm: &'a str,
}

#[derive(Deserialize)]
pub struct CarQuery {
    pub car_name: String,
    pub brand: String,
}

#[derive(Deserialize)]
pub struct NewUser {
    pub name: String,
    pub password: String,
    pub perm: String,
}

#[derive(Debug)]
pub struct Store {
    pub cars: Vec<Car>,
    pub registrations: Vec<Registration>,
    pub users: Vec<Account>,
    next_user_id: u32,
}

impl Store {
    pub fn seeded() -> Self {
        let car = |name: &str, brand: &str, price_range: &str, car_type: &str| Car {
            name: name.to_string(),
            brand: brand.to_string(),
            price_range: price_range.to_string(),
            car_type: car_type.to_string(),
        };
        let users: Vec<Account> = [
            ("qxf2", "qxf2", "admin"),
            ("admin", "admin123", "admin"),
            ("eric", "testqxf2", "non_admin"),
            ("morgan", "testqxf2", "non_admin"),
            ("dev", "dev123", "non_admin"),
        ]
        .into_iter()
        .zip(1..)
        .map(|((name, password, perm), user_id)| Account {
            user_id,
            name: name.to_string(),
            password: password.to_string(),
            perm: perm.to_string(),
        })
        .collect();

        Self {
            cars: vec![
                car("Swift", "Maruti", "3-5 lacs", "hatchback"),
                car("Creta", "Hyundai", "8-14 lacs", "hatchback"),
                car("City", "Honda", "3-6 lacs", "sedan"),
                car("Vento", "Volkswagen", "7-10 lacs", "sedan"),
            ],
            registrations: Vec::new(),
            next_user_id: users.len() as u32 + 1,
            users,
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::seeded()
    }
}

pub type Db = Arc<RwLock<Store>>;

type Reply = (StatusCode, Json<Value>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Admin,
    User,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    Router::new()
        .route("/cars", get(list_cars))
        .route("/cars/find", get(find_car))
        .route("/cars/add", post(add_car))
        .route("/cars/update/{name}", put(update_car))
        .route("/cars/remove/{name}", delete(remove_car))
        .route("/register", get(list_registrations))
        .route("/register/list", get(list_registrations))
        .route("/register/car", post(register_car))
        .route("/register/car/delete", delete(delete_registration))
        .route("/users", get(list_users))
        .route("/users/add", post(add_user))
        .route("/users/update/{id}", put(update_user))
        .route("/users/delete/{id}", delete(delete_user))
        .route("/reset", post(reset))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Resolve Basic credentials against the store's accounts.
pub fn authenticate(headers: &HeaderMap, store: &Store) -> Result<Access, Reply> {
    let encoded = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .ok_or_else(unauthorized)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(unauthorized)?;
    let (name, password) = decoded.split_once(':').ok_or_else(unauthorized)?;
    let account = store
        .users
        .iter()
        .find(|user| user.name == name && user.password == password)
        .ok_or_else(unauthorized)?;
    Ok(if account.perm == "admin" {
        Access::Admin
    } else {
        Access::User
    })
}

fn require_admin(headers: &HeaderMap, store: &Store) -> Result<(), Reply> {
    match authenticate(headers, store)? {
        Access::Admin => Ok(()),
        // Non-admins get a 200 with a failure flag, not a 403.
        Access::User => Err(ok(json!({
            "successful": false,
            "response": "You are not allowed to access this resource",
        }))),
    }
}

fn ok(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"successful": false, "response": "Authentication required"})),
    )
}

fn not_found(what: &str) -> Reply {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"successful": false, "response": format!("{what} not found")})),
    )
}

fn view(account: &Account) -> UserView<'_> {
    UserView {
        user_id: account.user_id,
        name: &account.name,
        perm: &account.perm,
    }
}

async fn list_cars(State(db): State<Db>, headers: HeaderMap) -> Result<Reply, Reply> {
    let store = db.read().await;
    authenticate(&headers, &store)?;
    Ok(ok(json!({"cars_list": store.cars, "successful": true})))
}

async fn find_car(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<CarQuery>,
) -> Result<Reply, Reply> {
    let store = db.read().await;
    authenticate(&headers, &store)?;
    let car = store
        .cars
        .iter()
        .find(|car| car.name == query.car_name && car.brand == query.brand)
        .ok_or_else(|| not_found("car"))?;
    Ok(ok(json!({"car": car, "successful": true})))
}

async fn add_car(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(car): Json<Car>,
) -> Result<Reply, Reply> {
    let mut store = db.write().await;
    authenticate(&headers, &store)?;
    store.cars.push(car);
    Ok(ok(json!({"response": "Successfully added", "successful": true})))
}

async fn update_car(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(input): Json<Car>,
) -> Result<Reply, Reply> {
    let mut store = db.write().await;
    authenticate(&headers, &store)?;
    let car = store
        .cars
        .iter_mut()
        .find(|car| car.name == name)
        .ok_or_else(|| not_found("car"))?;
    *car = input;
    Ok(ok(json!({"car": car, "successful": true})))
}

async fn remove_car(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Reply, Reply> {
    let mut store = db.write().await;
    authenticate(&headers, &store)?;
    let index = store
        .cars
        .iter()
        .position(|car| car.name == name)
        .ok_or_else(|| not_found("car"))?;
    let car = store.cars.remove(index);
    Ok(ok(json!({"car": car, "successful": true})))
}

async fn list_registrations(State(db): State<Db>, headers: HeaderMap) -> Result<Reply, Reply> {
    let store = db.read().await;
    authenticate(&headers, &store)?;
    Ok(ok(json!({"registered": store.registrations, "successful": true})))
}

async fn register_car(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<CarQuery>,
    Json(customer_details): Json<CustomerDetails>,
) -> Result<Reply, Reply> {
    let mut store = db.write().await;
    authenticate(&headers, &store)?;
    let Some(car) = store
        .cars
        .iter()
        .find(|car| car.name == query.car_name && car.brand == query.brand)
        .cloned()
    else {
        return Ok(ok(json!({"registered_car": {"successful": false}})));
    };
    let registration = Registration {
        car,
        customer_details,
        registration_token: Uuid::new_v4(),
    };
    store.registrations.push(registration.clone());
    Ok(ok(json!({
        "registered_car": {
            "car": registration.car,
            "customer_details": registration.customer_details,
            "registration_token": registration.registration_token,
            "successful": true,
        }
    })))
}

/// Drops the oldest registration.
async fn delete_registration(State(db): State<Db>, headers: HeaderMap) -> Result<Reply, Reply> {
    let mut store = db.write().await;
    authenticate(&headers, &store)?;
    if store.registrations.is_empty() {
        return Ok(ok(json!({"response": "No registered cars", "successful": false})));
    }
    let deleted = store.registrations.remove(0);
    Ok(ok(json!({"deleted": deleted, "successful": true})))
}

async fn list_users(State(db): State<Db>, headers: HeaderMap) -> Result<Reply, Reply> {
    let store = db.read().await;
    require_admin(&headers, &store)?;
    let users: Vec<UserView<'_>> = store.users.iter().map(view).collect();
    Ok(ok(json!({"user_list": users, "successful": true})))
}

async fn add_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NewUser>,
) -> Result<Reply, Reply> {
    let mut store = db.write().await;
    require_admin(&headers, &store)?;
    let account = Account {
        user_id: store.next_user_id,
        name: input.name,
        password: input.password,
        perm: input.perm,
    };
    store.next_user_id += 1;
    let body = json!({"user": view(&account), "successful": true});
    store.users.push(account);
    Ok(ok(body))
}

async fn update_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u32>,
    Json(input): Json<NewUser>,
) -> Result<Reply, Reply> {
    let mut store = db.write().await;
    require_admin(&headers, &store)?;
    let account = store
        .users
        .iter_mut()
        .find(|user| user.user_id == id)
        .ok_or_else(|| not_found("user"))?;
    account.name = input.name;
    account.password = input.password;
    account.perm = input.perm;
    Ok(ok(json!({"user": view(account), "successful": true})))
}

async fn delete_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u32>,
) -> Result<Reply, Reply> {
    let mut store = db.write().await;
    require_admin(&headers, &store)?;
    let index = store
        .users
        .iter()
        .position(|user| user.user_id == id)
        .ok_or_else(|| not_found("user"))?;
    store.users.remove(index);
    Ok(ok(json!({"successful": true})))
}

async fn reset(State(db): State<Db>, headers: HeaderMap) -> Result<Reply, Reply> {
    let mut store = db.write().await;
    require_admin(&headers, &store)?;
    *store = Store::seeded();
    Ok(ok(json!({"response": "Application state reset", "successful": true})))
}
