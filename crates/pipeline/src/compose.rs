//! Composition orchestrator.
//!
//! Per-clip normalization fans out onto a bounded pool; composing waits for
//! every clip, then joins or tiles. Every temporary lives in one job-scoped
//! [`TempDir`] that is removed on success, failure, cancellation or unwind.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};

use clipgrid_core::assembly::{ExportConfig, OUTPUT_EXTENSION};
use clipgrid_core::ffmpeg::even_dimension;
use clipgrid_core::graph::ResolvedFieldMap;
use clipgrid_core::label::{build_label, render_svg, LabelSpec};
use clipgrid_core::layout::{GridLayout, TilingMode};
use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engine::{LabelOverlay, NormalizeJob, TranscodeEngine};
use crate::error::PipelineError;
use crate::job::{JobState, JobTracker};
use crate::raster::LabelRasterizer;

const JOB_DIR_PREFIX: &str = "clipgrid-job-";
const CONCAT_LIST_FILE: &str = "concat.txt";

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A clip handed to the composer.
#[derive(Debug, Clone)]
pub struct ClipInput {
    pub path: PathBuf,
    /// Display name, used for the fallback label and in errors.
    pub name: String,
    /// Fields available to the label.
    pub fields: ResolvedFieldMap,
}

#[derive(Debug, Clone)]
pub struct PlannedClip {
    pub input: PathBuf,
    pub name: String,
    pub label: Option<LabelSpec>,
}

/// Everything needed to run one export.
#[derive(Debug, Clone)]
pub struct CompositionPlan {
    pub clips: Vec<PlannedClip>,
    pub config: ExportConfig,
    pub layout: GridLayout,
    /// Absolute output canvas.
    pub canvas: (u32, u32),
}

impl CompositionPlan {
    /// Plan geometry and build label text. Fails only when there are no clips.
    pub fn new(clips: Vec<ClipInput>, config: ExportConfig) -> Result<Self, PipelineError> {
        if clips.is_empty() {
            return Err(PipelineError::NoClips);
        }

        let canvas = config.canvas(clips.len());
        let layout = config.layout(clips.len());

        let clips = clips
            .into_iter()
            .map(|clip| {
                let label = config
                    .burn_in_labels
                    .then(|| build_label(&clip.fields, &config.label_fields, &clip.name));
                PlannedClip {
                    input: clip.path,
                    name: clip.name,
                    label,
                }
            })
            .collect();

        Ok(Self {
            clips,
            config,
            layout,
            canvas,
        })
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// The finished export. Owns the job directory; dropping it deletes the file.
#[derive(Debug)]
pub struct ComposedArtifact {
    workdir: TempDir,
    path: PathBuf,
    file_name: String,
}

impl ComposedArtifact {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Open the artifact for streaming. The reader takes over the job
    /// directory, which is removed once the reader is dropped.
    pub async fn open(self) -> std::io::Result<ArtifactReader> {
        let file = tokio::fs::File::open(&self.path).await?;
        let size = file.metadata().await?.len();
        Ok(ArtifactReader {
            file,
            size,
            _workdir: self.workdir,
        })
    }
}

/// Reads a composed artifact while keeping its job directory alive.
#[derive(Debug)]
pub struct ArtifactReader {
    file: File,
    size: u64,
    _workdir: TempDir,
}

impl ArtifactReader {
    /// Artifact size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl AsyncRead for ArtifactReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

/// Runs composition plans against a [`TranscodeEngine`].
pub struct Composer<E> {
    engine: Arc<E>,
    rasterizer: LabelRasterizer,
    concurrency: usize,
    scratch_root: Option<PathBuf>,
}

impl<E: TranscodeEngine + 'static> Composer<E> {
    pub fn new(engine: Arc<E>, rasterizer: LabelRasterizer, concurrency: usize) -> Self {
        Self {
            engine,
            rasterizer,
            concurrency: concurrency.max(1),
            scratch_root: None,
        }
    }

    /// Create job directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run a plan to completion.
    ///
    /// The first per-clip failure cancels the remaining clips and is returned.
    /// Cancelling `cancel` stops new work and returns
    /// [`PipelineError::Cancelled`].
    pub async fn compose(
        &self,
        plan: &CompositionPlan,
        cancel: &CancellationToken,
    ) -> Result<ComposedArtifact, PipelineError> {
        if plan.clips.is_empty() {
            return Err(PipelineError::NoClips);
        }

        let mut tracker = JobTracker::new(Uuid::new_v4());
        tracing::info!(
            job_id = %tracker.id(),
            mode = %plan.config.mode,
            clips = plan.clips.len(),
            canvas_w = plan.canvas.0,
            canvas_h = plan.canvas.1,
            cell_w = plan.layout.cell_width,
            cell_h = plan.layout.cell_height,
            labels = plan.config.burn_in_labels,
            "Export job started",
        );

        match self.run(plan, &mut tracker, cancel).await {
            Ok(artifact) => {
                tracing::info!(
                    job_id = %tracker.id(),
                    file = %artifact.file_name,
                    "Export job finished",
                );
                Ok(artifact)
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %tracker.id(),
                    state = %tracker.state(),
                    error = %e,
                    "Export job failed",
                );
                tracker.fail();
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        plan: &CompositionPlan,
        tracker: &mut JobTracker,
        cancel: &CancellationToken,
    ) -> Result<ComposedArtifact, PipelineError> {
        let workdir = self.job_dir()?;
        let layout = &plan.layout;
        let config = &plan.config;

        // Cancelled by the caller or by the first failing clip.
        let job_cancel = cancel.child_token();
        let mut tasks: JoinSet<Result<(), PipelineError>> = JoinSet::new();

        let scheduled = self
            .schedule(plan, tracker, workdir.path(), &job_cancel, &mut tasks)
            .await;
        let normalized = match scheduled {
            Ok(normalized) => normalized,
            Err(e) => return Err(abort(&job_cancel, &mut tasks, e).await),
        };

        // Barrier: every clip must finish before composing.
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined.map_err(PipelineError::from).and_then(|r| r) {
                return Err(abort(&job_cancel, &mut tasks, e).await);
            }
        }
        if job_cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        tracker.transition(JobState::Composing)?;
        let file_name = output_file_name();
        let output = workdir.path().join(&file_name);

        let composed = match config.mode {
            TilingMode::Sequential => {
                let list_file = workdir.path().join(CONCAT_LIST_FILE);
                tokio::select! {
                    biased;
                    _ = job_cancel.cancelled() => return Err(PipelineError::Cancelled),
                    r = self.engine.concat(&normalized, &list_file, &output, config.fps) => r,
                }
            }
            TilingMode::Grid => {
                tracing::debug!(
                    job_id = %tracker.id(),
                    columns = layout.columns,
                    rows = layout.rows,
                    unused_cells = layout.unused_cells(),
                    "Tiling grid",
                );
                tokio::select! {
                    biased;
                    _ = job_cancel.cancelled() => return Err(PipelineError::Cancelled),
                    r = self.engine.tile(&normalized, layout, plan.canvas, &output, config.fps) => r,
                }
            }
        };
        composed.map_err(PipelineError::Composition)?;

        tracker.transition(JobState::Finalized)?;
        Ok(ComposedArtifact {
            workdir,
            path: output,
            file_name,
        })
    }

    /// Render labels and spawn one normalize task per clip, in input order.
    /// Returns the normalized output paths.
    async fn schedule(
        &self,
        plan: &CompositionPlan,
        tracker: &mut JobTracker,
        workdir: &Path,
        job_cancel: &CancellationToken,
        tasks: &mut JoinSet<Result<(), PipelineError>>,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let config = &plan.config;
        // libx264 with yuv420p needs even frame sizes.
        let cell_width = even_dimension(plan.layout.cell_width);
        let cell_height = even_dimension(plan.layout.cell_height);
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut normalized = Vec::with_capacity(plan.clips.len());

        for (index, clip) in plan.clips.iter().enumerate() {
            if job_cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            tracker.transition(JobState::Normalizing { clip: index })?;

            let overlay = match &clip.label {
                Some(label) => {
                    tracker.transition(JobState::Overlaying { clip: index })?;
                    let image = workdir.join(format!("label-{index}.png"));
                    self.render_label(index, label, cell_width, &image).await?;
                    Some(LabelOverlay {
                        image,
                        y: cell_height.saturating_sub(label.overlay_height()),
                    })
                }
                None => None,
            };

            let output = workdir.join(format!("{index:03}.{OUTPUT_EXTENSION}"));
            normalized.push(output.clone());

            let job = NormalizeJob {
                index,
                input: clip.input.clone(),
                output,
                fit: config.fit,
                cell_width,
                cell_height,
                fps: config.fps,
                overlay,
            };
            tasks.spawn(normalize_clip(
                Arc::clone(&self.engine),
                Arc::clone(&permits),
                job_cancel.clone(),
                job,
                clip.name.clone(),
            ));
        }

        Ok(normalized)
    }

    fn job_dir(&self) -> Result<TempDir, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(JOB_DIR_PREFIX);
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn render_label(
        &self,
        index: usize,
        label: &LabelSpec,
        width: u32,
        path: &Path,
    ) -> Result<(), PipelineError> {
        let svg = render_svg(label, width);
        let rasterizer = self.rasterizer.clone();
        let png = tokio::task::spawn_blocking(move || rasterizer.render_png(&svg))
            .await?
            .map_err(|source| PipelineError::LabelRender { index, source })?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }
}

/// Stop every worker and wait for them before handing back `error`, so no
/// task outlives the job directory.
async fn abort(
    job_cancel: &CancellationToken,
    tasks: &mut JoinSet<Result<(), PipelineError>>,
    error: PipelineError,
) -> PipelineError {
    job_cancel.cancel();
    tasks.shutdown().await;
    error
}

async fn normalize_clip<E: TranscodeEngine>(
    engine: Arc<E>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    job: NormalizeJob,
    name: String,
) -> Result<(), PipelineError> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        permit = permits.acquire_owned() => permit.map_err(|_| PipelineError::Cancelled)?,
    };

    tracing::debug!(index = job.index, clip = %name, "Normalizing clip");
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        r = engine.normalize(&job) => r,
    };

    result.map_err(|source| PipelineError::Normalization {
        index: job.index,
        name,
        source,
    })
}

fn output_file_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("export-{millis}.{OUTPUT_EXTENSION}")
}
