//! Mapping of use case errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    infrastructure::dto::http::ErrorResponse,
    usecase::{AuthError, ConnectError, DirectoryError, LoginError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(message)
            | ApiError::NotFound(message)
            | ApiError::BadRequest(message)
            | ApiError::Internal(message) => message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Storage(e) => {
                tracing::error!("Storage failure during authentication: {}", e);
                ApiError::Internal("internal server error".to_string())
            }
            _ => ApiError::Unauthorized("Token is not valid".to_string()),
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(error: LoginError) -> Self {
        match error {
            LoginError::InvalidCredentials => {
                ApiError::Unauthorized("invalid username or password".to_string())
            }
            other => {
                tracing::error!("Login failed: {}", other);
                ApiError::Internal("internal server error".to_string())
            }
        }
    }
}

impl From<ConnectError> for ApiError {
    fn from(error: ConnectError) -> Self {
        match error {
            ConnectError::Unauthorized(e) => ApiError::from(e),
            ConnectError::RoomNotFound(id) => ApiError::NotFound(format!("room {id} not found")),
            other => {
                tracing::error!("Connect failed: {}", other);
                ApiError::Internal("internal server error".to_string())
            }
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::ServerNotFound(_) => ApiError::NotFound(error.to_string()),
            DirectoryError::Storage(e) => {
                tracing::error!("Directory lookup failed: {}", e);
                ApiError::Internal("internal server error".to_string())
            }
        }
    }
}
