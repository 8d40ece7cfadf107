use axum::{extract::State, Json};
use serde::Serialize;

use crate::models::ProviderKind;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub network: String,
    pub mode: String,
    pub simulation_forced: bool,
    pub provider: Option<ProviderKind>,
    pub block_number: Option<u64>,
    pub active_sessions: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let live = state.dispatcher.gateway().live_status().await;
    let mode = if live.provider.is_some() {
        "live"
    } else {
        "simulation"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        network: live.network,
        mode: mode.to_string(),
        simulation_forced: live.simulation_forced,
        provider: live.provider,
        block_number: live.block_number,
        active_sessions: state.session.active_count().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::offline_state;

    #[tokio::test]
    async fn health_reports_simulation_without_contract() {
        // No contract configured means simulation is forced
        let Json(health) = health_check(State(offline_state())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.mode, "simulation");
        assert!(health.simulation_forced);
        assert!(health.provider.is_none());
        assert_eq!(health.active_sessions, 0);
    }
}
