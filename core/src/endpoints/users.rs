//! `/users`

use std::sync::Arc;

use serde_json::Value;

use super::{json_body, Endpoint};
use crate::envelope::ResponseEnvelope;
use crate::error::ApiResult;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::transport::Transport;
use crate::types::NewUser;

#[derive(Debug, Clone)]
pub struct UsersApi {
    endpoint: Endpoint,
}

impl UsersApi {
    pub fn new(transport: Arc<Transport>, base_url: &str) -> Self {
        Self {
            endpoint: Endpoint::new(transport, base_url, "users"),
        }
    }

    pub fn url(&self, suffix: &str) -> String {
        self.endpoint.url(suffix)
    }

    pub fn build_get_user_list(&self, headers: &Headers) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(""), headers)
    }

    pub fn build_add_user(&self, user: &NewUser, headers: &Headers) -> ApiResult<HttpRequest> {
        Ok(HttpRequest::new(HttpMethod::Post, self.url("/add"), headers).with_body(json_body(user)?))
    }

    pub fn build_update_user(&self, user_id: u32, user: &NewUser, headers: &Headers) -> ApiResult<HttpRequest> {
        let url = self.endpoint.item_url("update", &user_id.to_string());
        Ok(HttpRequest::new(HttpMethod::Put, url, headers).with_body(json_body(user)?))
    }

    pub fn build_delete_user(&self, user_id: u32, headers: &Headers) -> HttpRequest {
        let url = self.endpoint.item_url("delete", &user_id.to_string());
        HttpRequest::new(HttpMethod::Delete, url, headers)
    }

    pub fn get_user_list(&self, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call(&self.build_get_user_list(headers))
    }

    /// Raising variant: auth and not-found statuses come back as `Err`.
    pub fn fetch_user_list(&self, headers: &Headers) -> ApiResult<Value> {
        self.endpoint.transport().request_json(&self.build_get_user_list(headers))
    }

    pub fn add_user(&self, user: &NewUser, headers: &Headers) -> ResponseEnvelope {
        let url = self.url("/add");
        self.endpoint.call_built(url, self.build_add_user(user, headers))
    }

    pub fn update_user(&self, user_id: u32, user: &NewUser, headers: &Headers) -> ResponseEnvelope {
        let url = self.endpoint.item_url("update", &user_id.to_string());
        self.endpoint.call_built(url, self.build_update_user(user_id, user, headers))
    }

    pub fn delete_user(&self, user_id: u32, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call(&self.build_delete_user(user_id, headers))
    }

    pub async fn get_user_list_async(&self, headers: &Headers) -> ResponseEnvelope {
        self.endpoint.call_async(self.build_get_user_list(headers)).await
    }
}
