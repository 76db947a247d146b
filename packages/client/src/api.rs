//! HTTP calls to the relay server.

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::StatusCode;
use roomcast_server::infrastructure::dto::http::LoginResponse;
use serde_json::json;

use crate::error::ClientError;

/// Thin wrapper over the relay's HTTP API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `POST /api/auth/login`. The password is sent base64-encoded.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = json!({
            "username": username,
            "password": STANDARD.encode(password),
        });

        let response = self
            .http
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<LoginResponse>()
                .await
                .map_err(|e| ClientError::ConnectionError(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(ClientError::InvalidCredentials),
            status => Err(ClientError::ConnectionError(format!(
                "login failed with status {}",
                status
            ))),
        }
    }
}
