use clipgrid_core::ffmpeg::FfmpegError;

use crate::raster::RasterError;

/// Errors that abort an export job.
///
/// Every variant is terminal: no partial artifact is returned and the job's
/// scratch directory has already been released when the caller sees it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No clips to compose")]
    NoClips,

    #[error("Clip {index} ('{name}') failed to normalize: {source}")]
    Normalization {
        index: usize,
        name: String,
        #[source]
        source: FfmpegError,
    },

    #[error("Label for clip {index} could not be rendered: {source}")]
    LabelRender {
        index: usize,
        #[source]
        source: RasterError,
    },

    #[error("Composition failed: {0}")]
    Composition(#[source] FfmpegError),

    #[error("Export cancelled")]
    Cancelled,

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
