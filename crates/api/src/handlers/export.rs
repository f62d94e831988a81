//! Export: compose uploaded clips into one video.

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use clipgrid_core::assembly::{coerce_export_form, workflow_fields, ExportForm, OUTPUT_CONTENT_TYPE};
use clipgrid_core::graph::ResolvedFieldMap;
use clipgrid_pipeline::{ClipInput, CompositionPlan, PipelineError};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::upload::{next_field, SavedUpload, UploadDir};

/// Most clips accepted by one export request.
pub const MAX_EXPORT_CLIPS: usize = 200;

/// POST /export
///
/// Multipart fields: export options as text, ordered `clips` files and
/// optional ordered `workflows` documents (one per clip, missing ones treated
/// as empty). Responds with the composed video as an attachment, streamed
/// from the job directory, which is removed once the body is sent.
pub async fn export(State(state): State<AppState>, mut multipart: Multipart) -> AppResult<Response> {
    let uploads = UploadDir::new()?;
    let mut form = ExportForm::default();
    let mut clips: Vec<SavedUpload> = Vec::new();
    let mut workflows: Vec<ResolvedFieldMap> = Vec::new();

    while let Some(field) = next_field(&mut multipart).await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "clips" => {
                if clips.len() >= MAX_EXPORT_CLIPS {
                    return Err(AppError::BadRequest(format!(
                        "At most {MAX_EXPORT_CLIPS} clips can be exported at once"
                    )));
                }
                clips.push(uploads.save(field, clips.len()).await?);
            }
            "workflows" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let fields = workflow_fields(&bytes);
                if fields.is_empty() {
                    tracing::debug!(index = workflows.len(), "Workflow document carried no fields");
                }
                workflows.push(fields);
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !form.set(&name, value) {
                    tracing::debug!(field = %name, "Ignoring unknown export field");
                }
            }
        }
    }

    // Mode is validated before any clip is touched.
    let (config, fallbacks) = coerce_export_form(&form)?;
    for fallback in &fallbacks {
        tracing::warn!(
            field = fallback.field,
            raw = %fallback.raw,
            default = %fallback.default,
            "Export option unusable, using default",
        );
    }
    if clips.is_empty() {
        return Err(PipelineError::NoClips.into());
    }

    tracing::info!(
        mode = %config.mode,
        clips = clips.len(),
        upload_bytes = clips.iter().map(|c| c.size).sum::<u64>(),
        workflows = workflows.len(),
        resolution = %format!("{}x{}", config.resolution.0, config.resolution.1),
        fps = config.fps,
        labels = config.burn_in_labels,
        label_fields = config.label_fields.len(),
        "Export request received",
    );

    workflows.resize_with(clips.len(), ResolvedFieldMap::default);
    let inputs = clips
        .into_iter()
        .zip(workflows)
        .map(|(clip, fields)| ClipInput {
            path: clip.path,
            name: clip.original_name,
            fields,
        })
        .collect();
    let plan = CompositionPlan::new(inputs, config)?;

    let cancel = state.shutdown.child_token();
    let artifact = state.composer.compose(&plan, &cancel).await?;
    let file_name = artifact.file_name().to_string();
    let reader = artifact
        .open()
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to open export: {e}")))?;
    let size = reader.size();

    tracing::info!(file = %file_name, bytes = size, "Export ready");
    Ok((
        [
            (CONTENT_TYPE, OUTPUT_CONTENT_TYPE.to_string()),
            (CONTENT_LENGTH, size.to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        Body::from_stream(ReaderStream::new(reader)),
    )
        .into_response())
}
