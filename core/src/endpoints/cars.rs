//! `/cars` and `/reset`.

use std::sync::Arc;

use tracing::info;

use super::{json_body, Endpoint};
use crate::envelope::ResponseEnvelope;
use crate::error::ApiResult;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::transport::Transport;
use crate::types::{Car, CarQuery};

#[derive(Debug, Clone)]
pub struct CarsApi {
    endpoint: Endpoint,
}

impl CarsApi {
    pub fn new(transport: Arc<Transport>, base_url: &str) -> Self {
        Self {
            endpoint: Endpoint::new(transport, base_url, "cars"),
        }
    }

    pub fn url(&self, suffix: &str) -> String {
        self.endpoint.url(suffix)
    }

    pub fn build_get_cars(&self, headers: &Headers) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(""), headers)
    }

    pub fn build_get_car(&self, query: &CarQuery, headers: &Headers) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url("/find"), headers).with_query(query.to_pairs())
    }

    pub fn build_add_car(&self, car: &Car, headers: &Headers) -> ApiResult<HttpRequest> {
        Ok(HttpRequest::new(HttpMethod::Post, self.url("/add"), headers).with_body(json_body(car)?))
    }

    pub fn build_update_car(&self, car_name: &str, car: &Car, headers: &Headers) -> ApiResult<HttpRequest> {
        Ok(HttpRequest::new(HttpMethod::Put, self.endpoint.item_url("update", car_name), headers)
            .with_body(json_body(car)?))
    }

    pub fn build_remove_car(&self, car_name: &str, headers: &Headers) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.endpoint.item_url("remove", car_name), headers)
    }

    pub fn build_reset(&self, headers: &Headers) -> HttpRequest {
        HttpRequest::new(HttpMethod::Post, format!("{}/reset", self.endpoint.base_url()), headers)
    }

    pub fn get_cars(&self, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call(&self.build_get_cars(headers))
    }

    pub fn get_car(&self, query: &CarQuery, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call(&self.build_get_car(query, headers))
    }

    pub fn add_car(&self, car: &Car, headers: &Headers) -> ResponseEnvelope {
        let url = self.url("/add");
        info!(%url, car = %car.name, "adding car");
        self.endpoint.call_built(url, self.build_add_car(car, headers))
    }

    pub fn update_car(&self, car_name: &str, car: &Car, headers: &Headers) -> ResponseEnvelope {
        let url = self.endpoint.item_url("update", car_name);
        self.endpoint.call_built(url, self.build_update_car(car_name, car, headers))
    }

    pub fn remove_car(&self, car_name: &str, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call(&self.build_remove_car(car_name, headers))
    }

    pub fn reset_app_state(&self, headers: &Headers) -> ResponseEnvelope {
        let request = self.build_reset(headers);
        info!(url = %request.url, "resetting application state");
        self.endpoint.call(&request)
    }

    pub async fn get_cars_async(&self, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call_async(self.build_get_cars(headers)).await
    }

    pub async fn get_car_async(&self, query: &CarQuery, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call_async(self.build_get_car(query, headers)).await
    }

    pub async fn add_car_async(&self, car: &Car, headers: &Headers) -> ResponseEnvelope {
        let url = self.url("/add");
        self.endpoint.call_built_async(url, self.build_add_car(car, headers)).await
    }
}
