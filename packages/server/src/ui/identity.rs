//! Extraction of the caller's session token.
//!
//! Regular API calls carry `Authorization: Bearer <token>`. The WebSocket
//! connect request may instead carry it as the `token` (or `Authorization`)
//! query parameter, since browsers cannot set headers on the handshake.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::{domain::Username, infrastructure::dto::http::ConnectQuery};

/// Identity resolved by the session middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: Username,
}

pub fn extract_bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    Some(token)
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token)
        .map(str::to_string)
}

/// `token` takes precedence over `Authorization`; a `Bearer ` prefix is accepted.
pub fn token_from_query(query: &ConnectQuery) -> Option<String> {
    query
        .token
        .as_deref()
        .or(query.authorization.as_deref())
        .map(|value| extract_bearer_token(value).unwrap_or(value).trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
