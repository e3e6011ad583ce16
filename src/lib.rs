//! Asphalt-concrete price matrix: cost and profitability engine with an
//! HTTP/JSON front for the calculator UI.

pub mod cache;
pub mod config;
pub mod error;
pub mod pricing;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use sqlx::PgPool;

use crate::cache::AppCache;
use crate::pricing::{DisplayFormat, MatrixLayout};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: AppCache,
    pub layout: Arc<MatrixLayout>,
    pub display: Arc<DisplayFormat>,
}

/// Full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/price-matrix", pricing::router())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "layout": state.layout.name,
        "cache": state.cache.stats(),
    }))
}
