use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod db;
mod error;
mod integrations;
mod models;
mod services;
mod utils;

use config::Config;
use constants::API_VERSION;
use db::{GameDataStore, MemoryStore, RedisStore};
use services::{
    ChainGateway, EvmConnector, GameActionDispatcher, ProviderSelector, SessionBridge,
    SimulationOracle,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clicker_chain_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting clicker chain backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Network: {}", config.network);
    tracing::info!("API Version: {}", API_VERSION);

    // Progress store
    let store: Arc<dyn GameDataStore> = match config.redis_url.as_deref() {
        Some(url) => {
            tracing::info!("Persisting game data in Redis");
            Arc::new(RedisStore::connect(url).await?)
        }
        None => {
            tracing::warn!("REDIS_URL not set; game data is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    // Chain access
    let connector = Arc::new(EvmConnector::new(
        config.signer_private_key.clone(),
        config.call_timeout(),
    ));
    let selector = Arc::new(
        ProviderSelector::new(Arc::new(config.network_config()), connector)
            .with_cache_ttl(config.provider_cache_ttl()),
    );
    let contract_address = config.live_contract_address().map(str::to_string);
    let gateway = Arc::new(ChainGateway::new(
        selector,
        SimulationOracle::new(),
        contract_address,
        config.confirmation_timeout(),
        config.receipt_poll_interval(),
    ));
    let dispatcher = Arc::new(GameActionDispatcher::new(
        gateway,
        config.max_multi_attack,
        config.daily_reward_cooldown_hours,
    ));
    let session = Arc::new(SessionBridge::new(store, dispatcher.clone()));

    // Log every action transition
    let mut transitions = dispatcher.subscribe();
    tokio::spawn(async move {
        loop {
            match transitions.recv().await {
                Ok(transition) => tracing::info!(
                    "Action {} for {} is now {:?}",
                    transition.kind,
                    transition.player,
                    transition.state
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Transition log skipped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let app_state = api::AppState {
        config: config.clone(),
        dispatcher,
        session,
    };

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Chain reads
        .route("/api/v1/player/{address}", get(api::player::get_player))
        .route("/api/v1/monster/{id}", get(api::player::get_monster))
        // Game actions
        .route("/api/v1/actions/{address}", post(api::actions::submit_action))
        .route(
            "/api/v1/actions/{address}/{kind}",
            get(api::actions::poll_action),
        )
        // Session & progress
        .route("/api/v1/session", post(api::session::connect))
        .route(
            "/api/v1/session/{address}",
            delete(api::session::disconnect),
        )
        .route(
            "/api/v1/game-data/{address}",
            get(api::session::load_game_data).put(api::session::save_game_data),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
