use axum::{
    extract::{Path, State},
    response::Response,
};

use crate::models::{ActionOutcome, Payload};

use super::{outcome_response, AppState};

/// GET /api/v1/player/{address}
pub async fn get_player(State(state): State<AppState>, Path(address): Path<String>) -> Response {
    let outcome = state.dispatcher.read_player(&address).await;

    // Only live snapshots are allowed to overwrite stored progress.
    if let ActionOutcome::Confirmed(Payload::Player(snapshot)) = &outcome {
        if let Err(err) = state.session.sync_snapshot(&address, snapshot).await {
            tracing::warn!("Failed to sync progress for {}: {}", address, err);
        }
    }
    outcome_response(outcome)
}

/// GET /api/v1/monster/{id}
pub async fn get_monster(State(state): State<AppState>, Path(monster_id): Path<u64>) -> Response {
    outcome_response(state.dispatcher.read_monster(monster_id).await)
}
