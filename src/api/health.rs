//! Health check endpoint

use super::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_connected: bool,
    pub generation_model: String,
    pub version: &'static str,
}

/// GET /api/health
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let db_ok = crate::db::ping(&state.db).await.is_ok();

    Json(HealthResponse {
        status: if db_ok { "healthy" } else { "degraded" },
        db_connected: db_ok,
        generation_model: state.pipeline.generator().model_name().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
