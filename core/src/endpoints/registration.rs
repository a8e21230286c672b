//! `/register`

use std::sync::Arc;

use super::{json_body, Endpoint};
use crate::envelope::ResponseEnvelope;
use crate::error::ApiResult;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::transport::Transport;
use crate::types::{CarQuery, CustomerDetails};

/// Registration endpoints. Counting registrations is the player's job.
#[derive(Debug, Clone)]
pub struct RegistrationApi {
    endpoint: Endpoint,
}

impl RegistrationApi {
    pub fn new(transport: Arc<Transport>, base_url: &str) -> Self {
        Self {
            endpoint: Endpoint::new(transport, base_url, "register"),
        }
    }

    pub fn url(&self, suffix: &str) -> String {
        self.endpoint.url(suffix)
    }

    pub fn build_register_car(
        &self,
        query: &CarQuery,
        customer: &CustomerDetails,
        headers: &Headers,
    ) -> ApiResult<HttpRequest> {
        Ok(HttpRequest::new(HttpMethod::Post, self.url("/car"), headers)
            .with_query(query.to_pairs())
            .with_body(json_body(customer)?))
    }

    pub fn build_get_registered_cars(&self, headers: &Headers) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(""), headers)
    }

    pub fn build_list_registered_cars(&self, headers: &Headers) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url("/list"), headers)
    }

    pub fn build_delete_registered_car(&self, headers: &Headers) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.url("/car/delete"), headers)
    }

    pub fn register_car(&self, query: &CarQuery, customer: &CustomerDetails, headers: &Headers) -> ResponseEnvelope {
        let url = self.url("/car");
        self.endpoint.call_built(url, self.build_register_car(query, customer, headers))
    }

    pub fn get_registered_cars(&self, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call(&self.build_get_registered_cars(headers))
    }

    pub fn delete_registered_car(&self, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call(&self.build_delete_registered_car(headers))
    }

    pub async fn get_registered_cars_async(&self, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call_async(self.build_list_registered_cars(headers)).await
    }
}
