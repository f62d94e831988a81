//! Export pipeline: per-clip normalization, label overlays and final
//! composition, run against a pluggable transcoding engine.

pub mod compose;
pub mod engine;
pub mod error;
pub mod job;
pub mod raster;

pub use compose::{
    ArtifactReader, ClipInput, ComposedArtifact, Composer, CompositionPlan, PlannedClip,
};
pub use engine::{FfmpegEngine, LabelOverlay, NormalizeJob, TranscodeEngine};
pub use error::PipelineError;
pub use raster::{LabelRasterizer, RasterError};
