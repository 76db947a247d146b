//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
};

use crate::{
    domain::ServerId,
    infrastructure::dto::http::{HealthResponse, RoomData, RoomListQuery, ServerData},
    ui::{error::ApiError, identity::AuthenticatedUser, state::AppState},
};

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// `GET /api/server/list`
pub async fn list_servers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<ServerData>>, ApiError> {
    tracing::debug!("'{}' listed servers", user.username);
    let servers = state.list_servers_usecase.execute().await?;

    // Domain Model から DTO への変換
    Ok(Json(servers.into_iter().map(ServerData::from).collect()))
}

/// `GET /api/server/info/{id}`
pub async fn get_server_info(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ServerData>, ApiError> {
    tracing::debug!("'{}' requested server {}", user.username, id);
    let id = ServerId::parse(&id).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let server = state.get_server_info_usecase.execute(id).await?;
    Ok(Json(server.into()))
}

/// `GET /api/server/room?id=<server id>`
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<RoomListQuery>,
) -> Result<Json<Vec<RoomData>>, ApiError> {
    tracing::debug!("'{}' listed rooms", user.username);
    let raw = query
        .id
        .ok_or_else(|| ApiError::BadRequest("missing server id".to_string()))?;
    let server_id = ServerId::parse(&raw).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let rooms = state.list_rooms_usecase.execute(server_id).await?;
    Ok(Json(rooms.into_iter().map(RoomData::from).collect()))
}
