//! The transcoding seam.
//!
//! The orchestrator only talks to [`TranscodeEngine`]; [`FfmpegEngine`] is
//! the production implementation that shells out to `ffmpeg`.

use std::path::{Path, PathBuf};

use clipgrid_core::ffmpeg::{
    concat_args, concat_list, normalize_args, run_ffmpeg, tile_args, FfmpegError, FfmpegTools,
    OverlayInput,
};
use clipgrid_core::layout::{FitPolicy, GridLayout};

/// A rendered label raster placed on the bottom edge of a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelOverlay {
    pub image: PathBuf,
    /// Top edge of the overlay: cell height minus overlay height.
    pub y: u32,
}

/// One clip's normalization request.
#[derive(Debug, Clone)]
pub struct NormalizeJob {
    pub index: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub fit: FitPolicy,
    pub cell_width: u32,
    pub cell_height: u32,
    pub fps: u32,
    /// Composited in the same encode pass when present.
    pub overlay: Option<LabelOverlay>,
}

/// External engine that does the pixel work.
///
/// Implementations must be cancel-safe: dropping a returned future abandons
/// the operation and must not leave a process running.
pub trait TranscodeEngine: Send + Sync {
    /// Fit one clip to its cell (plus optional label overlay), forcing the
    /// frame rate and dropping audio and metadata.
    fn normalize(
        &self,
        job: &NormalizeJob,
    ) -> impl std::future::Future<Output = Result<(), FfmpegError>> + Send;

    /// Join normalized clips end-to-end in the given order.
    fn concat(
        &self,
        inputs: &[PathBuf],
        list_file: &Path,
        output: &Path,
        fps: u32,
    ) -> impl std::future::Future<Output = Result<(), FfmpegError>> + Send;

    /// Tile normalized clips at the layout's offsets and scale the canvas to
    /// `canvas`.
    fn tile(
        &self,
        inputs: &[PathBuf],
        layout: &GridLayout,
        canvas: (u32, u32),
        output: &Path,
        fps: u32,
    ) -> impl std::future::Future<Output = Result<(), FfmpegError>> + Send;
}

/// [`TranscodeEngine`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    tools: FfmpegTools,
}

impl FfmpegEngine {
    pub fn new(tools: FfmpegTools) -> Self {
        Self { tools }
    }
}

impl TranscodeEngine for FfmpegEngine {
    async fn normalize(&self, job: &NormalizeJob) -> Result<(), FfmpegError> {
        if !job.input.exists() {
            return Err(FfmpegError::VideoNotFound(
                job.input.to_string_lossy().to_string(),
            ));
        }
        let overlay = job.overlay.as_ref().map(|o| OverlayInput {
            image: &o.image,
            y: o.y,
        });
        let args = normalize_args(
            &job.input,
            &job.output,
            job.fit,
            job.cell_width,
            job.cell_height,
            job.fps,
            overlay.as_ref(),
        );
        run_ffmpeg(&self.tools, &args).await
    }

    async fn concat(
        &self,
        inputs: &[PathBuf],
        list_file: &Path,
        output: &Path,
        fps: u32,
    ) -> Result<(), FfmpegError> {
        tokio::fs::write(list_file, concat_list(inputs)).await?;
        run_ffmpeg(&self.tools, &concat_args(list_file, output, fps)).await
    }

    async fn tile(
        &self,
        inputs: &[PathBuf],
        layout: &GridLayout,
        canvas: (u32, u32),
        output: &Path,
        fps: u32,
    ) -> Result<(), FfmpegError> {
        let args = tile_args(inputs, layout, canvas.0, canvas.1, output, fps);
        run_ffmpeg(&self.tools, &args).await
    }
}
