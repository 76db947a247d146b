//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

/// `POST /api/auth/login` request body. `password` is base64-encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /api/auth/login` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// RFC 3339 (JST)
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthAuthority {
    pub id: i64,
    pub authority: String,
}

/// `GET /api/auth/info` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthInfoResponse {
    pub username: String,
    pub authorities: Vec<AuthAuthority>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerData {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomData {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub server_id: i64,
}

/// `GET /api/server/room?id=` query.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomListQuery {
    pub id: Option<String>,
}

/// `GET /ws/connect` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectQuery {
    pub room: Option<String>,
    pub token: Option<String>,
    #[serde(rename = "Authorization")]
    pub authorization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
