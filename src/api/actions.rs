use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};

use crate::{
    error::{AppError, Result},
    models::{ActionKind, ApiResponse, GameAction},
    services::ActionStatus,
};

use super::{outcome_response, AppState};

/// POST /api/v1/actions/{address}
pub async fn submit_action(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(action): Json<GameAction>,
) -> Response {
    let outcome = state.dispatcher.dispatch(&address, action.clone()).await;
    if let Err(err) = state.session.apply_outcome(&address, &action, &outcome).await {
        tracing::warn!("Failed to record {} for {}: {}", action.kind(), address, err);
    }
    outcome_response(outcome)
}

/// GET /api/v1/actions/{address}/{kind}
pub async fn poll_action(
    State(state): State<AppState>,
    Path((address, kind)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ActionStatus>>> {
    let kind = ActionKind::parse(&kind)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown action '{}'", kind)))?;
    let status = state
        .dispatcher
        .poll(&address, kind)
        .await
        .ok_or_else(|| AppError::BadRequest(format!("Invalid player address '{}'", address)))?;
    if status.settled_now {
        if let (Some(action), Some(outcome)) = (&status.action, &status.outcome) {
            if let Err(err) = state.session.apply_outcome(&address, action, outcome).await {
                tracing::warn!("Failed to record settled {} for {}: {}", kind, address, err);
            }
        }
    }
    Ok(Json(ApiResponse::success(status)))
}
