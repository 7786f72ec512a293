pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;
pub mod store;
pub mod utils;

pub use auth::AuthService;
pub use state::AppState;
pub use store::Store;
pub use utils::{ApiError, ApiResult, Config};

use auth::{
    api_keys::ApiKeyStore, optional_session, require_session, require_session_or_api_key,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use middleware::{cors_layer, health_check, request_id_layer, trace_layer};
use std::sync::Arc;
use tower::ServiceBuilder;

/// Build the application state from configuration.
pub fn build_state(config: Arc<Config>) -> AppState {
    let api_keys = Arc::new(ApiKeyStore::new());
    let auth_service = Arc::new(AuthService::new(config.clone(), api_keys.clone()));

    AppState {
        store: Store::new(),
        auth_service,
        api_keys,
        config,
    }
}

/// Build the router with all routes and layers.
pub fn create_app(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/nonce", post(handlers::auth::nonce))
        .route("/api/auth/verify", post(handlers::auth::verify))
        .route("/api/prompts", get(handlers::prompts::search))
        .route("/api/tags", get(handlers::catalog::tags))
        .route("/api/ai-agents", get(handlers::catalog::ai_agents));

    // Optional identity: content gating wants to know who is asking, but
    // anonymous reads are fine.
    let loose_routes = Router::new()
        .route("/api/prompts/:id", get(handlers::prompts::get_by_id))
        .layer(from_fn_with_state(state.clone(), optional_session));

    // Session-token-only routes
    let session_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/api-keys", post(handlers::api_keys::create))
        .route("/api/api-keys", get(handlers::api_keys::list))
        .route("/api/api-keys/:id", delete(handlers::api_keys::revoke))
        .layer(from_fn_with_state(state.clone(), require_session));

    // Routes accepting either a session token or an API key
    let either_routes = Router::new()
        .route("/api/prompts", post(handlers::prompts::create))
        .route("/api/prompts/:id/purchase", post(handlers::prompts::purchase))
        .route("/api/prompts/:id/rate", post(handlers::prompts::rate))
        .layer(from_fn_with_state(state.clone(), require_session_or_api_key));

    Router::new()
        .merge(public_routes)
        .merge(loose_routes)
        .merge(session_routes)
        .merge(either_routes)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer())
                .layer(request_id_layer())
                .layer(cors_layer(&state.config)),
        )
        .with_state(state)
}
