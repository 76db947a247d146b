//! Session gating for protected routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{
    error::ApiError,
    identity::{AuthenticatedUser, token_from_headers},
    state::AppState,
};

/// Rejects requests without a valid, unexpired bearer session token.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = token_from_headers(request.headers());

    match state.authenticate_usecase.execute(token.as_deref()).await {
        Ok(username) => {
            request
                .extensions_mut()
                .insert(AuthenticatedUser { username });
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!("Rejected request to {}: {}", request.uri().path(), e);
            ApiError::from(e).into_response()
        }
    }
}
