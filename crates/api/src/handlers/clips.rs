//! Clip analysis and probing.

use axum::extract::{Multipart, State};
use axum::Json;
use clipgrid_core::clip::{analyze_clip, ClipDescriptor};
use clipgrid_core::ffmpeg::{probe_video, ProbeSummary};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::upload::{next_field, UploadDir};

/// Most files accepted by one analyze request.
pub const MAX_ANALYZE_FILES: usize = 200;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub items: Vec<ClipDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// POST /analyze
///
/// Probe every `files` part, discover its embedded workflow and resolve it
/// into a field map. A clip that cannot be probed is still listed, with
/// zeroed dimensions.
pub async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<AnalyzeResponse>> {
    let uploads = UploadDir::new()?;
    let mut items = Vec::new();

    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() != Some("files") {
            continue;
        }
        if items.len() >= MAX_ANALYZE_FILES {
            return Err(AppError::BadRequest(format!(
                "At most {MAX_ANALYZE_FILES} files can be analyzed per request"
            )));
        }

        let upload = uploads.save(field, items.len()).await?;
        let analysis = analyze_clip(&state.tools, &upload.path, &upload.original_name).await;
        if let Some(e) = &analysis.probe_error {
            tracing::warn!(clip = %upload.original_name, error = %e, "Probe failed, reporting zero dimensions");
        }
        tracing::debug!(
            clip = %upload.original_name,
            has_workflow = analysis.descriptor.graph.is_some(),
            fields = analysis.descriptor.fields.len(),
            "Analyzed clip",
        );
        items.push(analysis.descriptor);
    }

    tracing::info!(count = items.len(), "Analyze request complete");
    Ok(Json(AnalyzeResponse { items }))
}

/// POST /probe
///
/// Report one clip's dimensions and frame rate. Probe failures answer with
/// zeros rather than an error.
pub async fn probe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ProbeResponse>> {
    let uploads = UploadDir::new()?;
    let mut clip = None;

    while let Some(field) = next_field(&mut multipart).await? {
        if clip.is_none() && field.name() == Some("clip") {
            clip = Some(uploads.save(field, 0).await?);
        }
    }

    let Some(clip) = clip else {
        return Err(AppError::BadRequest("No clip uploaded".to_string()));
    };

    let summary = match probe_video(&state.tools, &clip.path).await {
        Ok(probe) => ProbeSummary::from_probe(&probe),
        Err(e) => {
            tracing::warn!(clip = %clip.original_name, error = %e, "Probe failed");
            ProbeSummary::default()
        }
    };

    Ok(Json(ProbeResponse {
        width: summary.width,
        height: summary.height,
        fps: summary.fps,
    }))
}
