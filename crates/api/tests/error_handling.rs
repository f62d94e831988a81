//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no router is
//! involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use clipgrid_api::error::AppError;
use clipgrid_core::error::CoreError;
use clipgrid_core::ffmpeg::FfmpegError;
use clipgrid_pipeline::PipelineError;
use http_body_util::BodyExt;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: CoreError::Validation maps to 400 with VALIDATION_ERROR code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("unknown sort key 'bogus'".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "unknown sort key 'bogus'");
}

// ---------------------------------------------------------------------------
// Test: CoreError::InvalidMode maps to 400 with INVALID_MODE code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_mode_returns_400() {
    let err = AppError::Core(CoreError::InvalidMode("mosaic".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_MODE");
    assert!(json["error"].as_str().unwrap().contains("mosaic"));
}

// ---------------------------------------------------------------------------
// Test: AppError::BadRequest maps to 400 with BAD_REQUEST code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("No clip uploaded".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "No clip uploaded");
}

// ---------------------------------------------------------------------------
// Test: a clip failure maps to 422 and names the clip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn normalization_failure_returns_422_with_clip_name() {
    let err = AppError::Pipeline(PipelineError::Normalization {
        index: 2,
        name: "render_0007.mp4".into(),
        source: FfmpegError::ExecutionFailed {
            exit_code: Some(1),
            stderr: "moov atom not found".into(),
        },
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "EXPORT_FAILED");
    assert!(json["error"].as_str().unwrap().contains("render_0007.mp4"));
}

// ---------------------------------------------------------------------------
// Test: PipelineError::NoClips maps to 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_clips_returns_400() {
    let (status, json) = error_to_response(AppError::Pipeline(PipelineError::NoClips)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "NO_CLIPS");
}

// ---------------------------------------------------------------------------
// Test: internal errors return 500 with a sanitized message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("/tmp/clipgrid-upload-abc: permission denied".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn pipeline_io_error_is_sanitized() {
    let err = AppError::Pipeline(PipelineError::Io(std::io::Error::other("disk full at /var")));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}
