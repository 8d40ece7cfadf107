use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::{ApiResponse, PlayerRecord},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub player: String,
    pub was_connected: bool,
}

/// POST /api/v1/session
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ApiResponse<PlayerRecord>>> {
    let record = state.session.activate(&req.address).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// DELETE /api/v1/session/{address}
pub async fn disconnect(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<DisconnectResponse>>> {
    let was_connected = state.session.deactivate(&address).await?;
    Ok(Json(ApiResponse::success(DisconnectResponse {
        player: address.trim().to_ascii_lowercase(),
        was_connected,
    })))
}

/// GET /api/v1/game-data/{address}
pub async fn load_game_data(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<PlayerRecord>>> {
    let record = state.session.load(&address).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// PUT /api/v1/game-data/{address}
pub async fn save_game_data(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(record): Json<PlayerRecord>,
) -> Result<Json<ApiResponse<PlayerRecord>>> {
    let saved = state.session.save(&address, record).await?;
    Ok(Json(ApiResponse::success(saved)))
}
