use axum::routing::post;
use axum::Router;

use crate::handlers::{clips, export, review};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(clips::analyze))
        .route("/probe", post(clips::probe))
        .route("/export", post(export::export))
        .route("/review", post(review::review))
}
