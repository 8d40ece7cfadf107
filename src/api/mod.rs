// src/api/mod.rs

pub mod actions;
pub mod health;
pub mod player;
pub mod session;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::config::Config;
use crate::error::status_for_failure;
use crate::models::{ActionOutcome, ApiResponse};
use crate::services::{GameActionDispatcher, SessionBridge};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dispatcher: Arc<GameActionDispatcher>,
    pub session: Arc<SessionBridge>,
}

/// `Confirmed` and `Simulated` are both 200; `Failed` carries its own status.
pub fn outcome_response(outcome: ActionOutcome) -> Response {
    match outcome.error_kind() {
        Some(kind) => (
            status_for_failure(kind),
            Json(ApiResponse {
                success: false,
                data: outcome,
            }),
        )
            .into_response(),
        None => (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response(),
    }
}
