use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clipgrid_core::error::CoreError;
use clipgrid_pipeline::PipelineError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`PipelineError`] and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent `{ error, code }` JSON.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An export that could not be produced.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error; the message is logged, never returned.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::InvalidMode(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_MODE", core.to_string())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Export pipeline ---
            AppError::Pipeline(err) => classify_pipeline_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Clip and composition failures surface their message so the user can see
/// which clip broke; plumbing failures are sanitized.
fn classify_pipeline_error(err: &PipelineError) -> (StatusCode, &'static str, String) {
    match err {
        PipelineError::NoClips => (
            StatusCode::BAD_REQUEST,
            "NO_CLIPS",
            "No clips uploaded".to_string(),
        ),
        PipelineError::Normalization { .. }
        | PipelineError::LabelRender { .. }
        | PipelineError::Composition(_) => {
            tracing::warn!(error = %err, "Export failed");
            (StatusCode::UNPROCESSABLE_ENTITY, "EXPORT_FAILED", err.to_string())
        }
        PipelineError::Cancelled => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "EXPORT_CANCELLED",
            err.to_string(),
        ),
        PipelineError::InvalidTransition { .. } | PipelineError::Io(_) | PipelineError::Join(_) => {
            tracing::error!(error = %err, "Export pipeline error");
            internal()
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
