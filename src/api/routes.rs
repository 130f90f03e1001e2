//! API Routes
//!
//! Configures the Axum router for the operational surface.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_all_handler, clear_category_handler, health_handler, stats_handler, sweep_handler,
    AppState,
};

/// Creates the operational router.
///
/// # Endpoints
/// - `GET /stats` - Cache and prefetch metrics snapshot
/// - `GET /health` - Health check
/// - `POST /sweep` - Immediate expired-entry sweep
/// - `DELETE /cache` - Clear both tiers
/// - `DELETE /cache/:category` - Clear one category
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/sweep", post(sweep_handler))
        .route("/cache", delete(clear_all_handler))
        .route("/cache/:category", delete(clear_category_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
