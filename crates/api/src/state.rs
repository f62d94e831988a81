use std::sync::Arc;

use clipgrid_core::ffmpeg::FfmpegTools;
use clipgrid_pipeline::{Composer, FfmpegEngine};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// `ffmpeg`/`ffprobe` locations used by analysis and probing.
    pub tools: Arc<FfmpegTools>,
    pub composer: Arc<Composer<FfmpegEngine>>,
    /// Cancelled when the server starts shutting down; every export runs
    /// under a child of this token.
    pub shutdown: CancellationToken,
}
