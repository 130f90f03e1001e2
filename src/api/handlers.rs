//! API Handlers
//!
//! HTTP request handlers for the operational surface. These endpoints
//! observe and maintain the cache; lookups themselves go through the
//! library's `CacheGateway`, not over HTTP.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CacheStore, Category};
use crate::error::{CacheError, Result};
use crate::models::{ClearResponse, HealthResponse, StatsResponse, SweepResponse};
use crate::prefetch::PrefetchScheduler;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CacheStore>,
    pub scheduler: Arc<PrefetchScheduler>,
}

impl AppState {
    pub fn new(store: Arc<CacheStore>, scheduler: Arc<PrefetchScheduler>) -> Self {
        Self { store, scheduler }
    }
}

/// Handler for GET /stats
///
/// Returns the combined cache and prefetch metrics snapshot.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.store.stats().await;
    let prefetch = state.scheduler.stats();
    Json(StatsResponse::new(cache, prefetch))
}

/// Handler for POST /sweep
///
/// Triggers an immediate expired-entry sweep across both tiers.
pub async fn sweep_handler(State(state): State<AppState>) -> Json<SweepResponse> {
    let removed = state.store.sweep_expired().await;
    Json(SweepResponse { removed })
}

/// Handler for DELETE /cache
///
/// Empties both tiers.
pub async fn clear_all_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.store.clear_all().await;
    Json(ClearResponse {
        category: "all".to_string(),
        removed,
    })
}

/// Handler for DELETE /cache/:category
///
/// Empties one category in both tiers.
pub async fn clear_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<ClearResponse>> {
    let category: Category = category
        .parse()
        .map_err(CacheError::InvalidRequest)?;

    let removed = state.store.clear_category(category).await;
    Ok(Json(ClearResponse {
        category: category.to_string(),
        removed,
    }))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
