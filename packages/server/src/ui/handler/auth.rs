//! Login and session introspection handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{
    infrastructure::dto::http::{AuthInfoResponse, LoginRequest, LoginResponse},
    ui::{error::ApiError, identity::token_from_headers, state::AppState},
};

/// `POST /api/auth/login`
///
/// The password arrives base64-encoded.
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let password = STANDARD
        .decode(request.password.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| ApiError::BadRequest("password must be base64-encoded".to_string()))?;

    let session = state
        .login_usecase
        .execute(&request.username, &password)
        .await?;

    Ok(Json(session.into()))
}

/// `GET /api/auth/info`
pub async fn auth_info(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AuthInfoResponse>, ApiError> {
    let token = token_from_headers(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Token is not valid".to_string()))?;
    let username = state.authenticate_usecase.get_auth_info(&token).await?;

    Ok(Json(AuthInfoResponse {
        username: username.into_string(),
        authorities: Vec::new(),
    }))
}
