use axum::extract::State;
use axum::{routing::get, Json, Router};
use clipgrid_core::ffmpeg::ffmpeg_version;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when ffmpeg cannot be run.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// First line of `ffmpeg -version`.
    pub ffmpeg: Option<String>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ffmpeg = ffmpeg_version(&state.tools).await;
    let status = if ffmpeg.is_some() { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        ffmpeg,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
