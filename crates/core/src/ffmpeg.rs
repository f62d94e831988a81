//! FFmpeg/FFprobe shared command utilities.
//!
//! Probing runs `ffprobe` and parses its JSON. Everything the composition
//! pipeline hands to `ffmpeg` is built by the pure argument builders below,
//! so the exact command lines can be asserted without spawning a process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::layout::{FitPolicy, GridLayout};

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("ffprobe timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("video file not found: {0}")]
    VideoNotFound(String),
}

/// Video codec used for every encode.
pub const VIDEO_CODEC: &str = "libx264";

/// Encoder speed preset.
pub const ENCODE_PRESET: &str = "veryfast";

/// Constant rate factor.
pub const ENCODE_CRF: u32 = 20;

/// Output pixel format.
pub const PIXEL_FORMAT: &str = "yuv420p";

/// Tags blanked at container and video-stream level on every output.
pub const STRIPPED_METADATA_TAGS: [&str; 6] = [
    "title",
    "comment",
    "description",
    "creation_time",
    "handler_name",
    "encoder",
];

/// Default ffprobe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Binary locations
// ---------------------------------------------------------------------------

/// Locations of the external binaries plus the probe timeout.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub probe_timeout: Duration,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    #[serde(default)]
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeStream {
    #[serde(default)]
    pub index: i32,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// e.g. "30/1" or "24000/1001"
    pub avg_frame_rate: Option<String>,
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
    /// Free-form stream tags. Generation tools embed workflows here.
    #[serde(default)]
    pub tags: Map<String, Value>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub size: Option<String>,
    pub format_name: Option<String>,
    /// Container-level tags (comment, description, workflow, ...).
    #[serde(default)]
    pub tags: Map<String, Value>,
}

/// Probed geometry and timing of a clip.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeSummary {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: f64,
}

impl ProbeSummary {
    pub fn from_probe(probe: &FfprobeOutput) -> Self {
        let (width, height) = parse_resolution(probe);
        Self {
            width: u32::try_from(width).unwrap_or(0),
            height: u32::try_from(height).unwrap_or(0),
            fps: parse_framerate(probe),
            duration: parse_duration(probe),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
///
/// The child process is killed if the probe exceeds `tools.probe_timeout`.
pub async fn probe_video(tools: &FfmpegTools, path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ));
    }

    let child = tokio::process::Command::new(&tools.ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(tools.probe_timeout, child)
        .await
        .map_err(|_| FfmpegError::Timeout(tools.probe_timeout))?
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))
}

/// Run `ffmpeg` with the given arguments and wait for it to finish.
///
/// The child is killed if the returned future is dropped, which is how
/// cancellation reaches an in-flight encode.
pub async fn run_ffmpeg(tools: &FfmpegTools, args: &[OsString]) -> Result<(), FfmpegError> {
    let output = tokio::process::Command::new(&tools.ffmpeg)
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}

/// Ask `ffmpeg -version` for its banner line. `None` when the binary is
/// missing or fails.
pub async fn ffmpeg_version(tools: &FfmpegTools) -> Option<String> {
    let output = tokio::process::Command::new(&tools.ffmpeg)
        .arg("-version")
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

// ---------------------------------------------------------------------------
// Argument builders
// ---------------------------------------------------------------------------

/// Round a frame dimension down to even, the smallest size `yuv420p`
/// accepts. Never below 2.
pub fn even_dimension(n: u32) -> u32 {
    (n & !1).max(2)
}

/// Scale-and-fit filter for one cell.
///
/// Letterbox scales down to fit and pads centered with black; crop-to-fill
/// scales up to cover and crops the excess.
pub fn fit_filter(policy: FitPolicy, width: u32, height: u32) -> String {
    match policy {
        FitPolicy::Letterbox => format!(
            "scale=w={width}:h={height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2"
        ),
        FitPolicy::CropToFill => format!(
            "scale=w={width}:h={height}:force_original_aspect_ratio=increase,\
             crop={width}:{height}"
        ),
    }
}

/// `-map_metadata -1 -map_chapters -1` plus blank tags at container and
/// first-video-stream level.
pub fn strip_metadata_args() -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-map_metadata", "-1", "-map_chapters", "-1"]
        .into_iter()
        .map(OsString::from)
        .collect();
    for scope in ["-metadata", "-metadata:s:v:0"] {
        for tag in STRIPPED_METADATA_TAGS {
            args.push(scope.into());
            args.push(format!("{tag}=").into());
        }
    }
    args
}

/// Fixed encode parameters shared by every output: frame rate, pixel
/// format, codec, preset, quality, no audio, stripped metadata.
pub fn encode_args(fps: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-r".into(),
        fps.to_string().into(),
        "-pix_fmt".into(),
        PIXEL_FORMAT.into(),
        "-c:v".into(),
        VIDEO_CODEC.into(),
        "-preset".into(),
        ENCODE_PRESET.into(),
        "-crf".into(),
        ENCODE_CRF.to_string().into(),
        "-an".into(),
    ];
    args.extend(strip_metadata_args());
    args
}

/// A label raster to composite onto the bottom of a normalized cell.
#[derive(Debug, Clone)]
pub struct OverlayInput<'a> {
    pub image: &'a Path,
    /// Vertical offset of the overlay's top edge (`cell height - overlay height`).
    pub y: u32,
}

/// Arguments for normalizing one clip to a cell, optionally compositing a
/// label overlay in the same pass.
pub fn normalize_args(
    input: &Path,
    output: &Path,
    policy: FitPolicy,
    cell_width: u32,
    cell_height: u32,
    fps: u32,
    overlay: Option<&OverlayInput<'_>>,
) -> Vec<OsString> {
    let fit = fit_filter(policy, cell_width, cell_height);
    let mut args: Vec<OsString> = vec!["-i".into(), input.into()];

    match overlay {
        Some(label) => {
            args.push("-i".into());
            args.push(label.image.into());
            args.push("-filter_complex".into());
            args.push(format!("[0:v]{fit}[fitted];[fitted][1:v]overlay=0:{}[outv]", label.y).into());
            args.push("-map".into());
            args.push("[outv]".into());
        }
        None => {
            args.push("-vf".into());
            args.push(fit.into());
        }
    }

    args.extend(encode_args(fps));
    args.push(output.into());
    args
}

/// Concat-demuxer list file contents, one `file '<path>'` line per input.
pub fn concat_list<P: AsRef<Path>>(inputs: &[P]) -> String {
    inputs
        .iter()
        .map(|p| {
            let escaped = p
                .as_ref()
                .to_string_lossy()
                .replace('\\', "\\\\")
                .replace('\'', "'\\''");
            format!("file '{escaped}'")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Arguments for joining normalized clips end-to-end through a concat list.
pub fn concat_args(list_file: &Path, output: &Path, fps: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_file.into(),
    ];
    args.extend(encode_args(fps));
    args.push(output.into());
    args
}

/// Grid filter graph over `layout.offsets.len()` normalized inputs.
///
/// Two or more inputs go through `xstack` with `fill=black`, then the
/// assembled canvas is padded to the full grid and scaled to the final size.
/// A single input cannot be stacked, so it is padded onto the canvas.
/// Padded and final sizes are rounded down to even.
pub fn tile_filter(layout: &GridLayout, out_width: u32, out_height: u32) -> String {
    let grid_w = even_dimension(layout.columns * layout.cell_width);
    let grid_h = even_dimension(layout.rows * layout.cell_height);
    let (out_width, out_height) = (even_dimension(out_width), even_dimension(out_height));
    let n = layout.offsets.len();

    let assembled = if n < 2 {
        format!("[0:v]pad={grid_w}:{grid_h}:0:0:color=black")
    } else {
        let inputs: String = (0..n).map(|i| format!("[{i}:v]")).collect();
        let positions = layout
            .offsets
            .iter()
            .map(|o| format!("{}_{}", o.x, o.y))
            .collect::<Vec<_>>()
            .join("|");
        format!(
            "{inputs}xstack=inputs={n}:layout={positions}:fill=black,\
             pad={grid_w}:{grid_h}:0:0:color=black"
        )
    };

    format!("{assembled},scale={out_width}:{out_height}[outv]")
}

/// Arguments for tiling normalized clips into one grid canvas.
pub fn tile_args<P: AsRef<Path>>(
    inputs: &[P],
    layout: &GridLayout,
    out_width: u32,
    out_height: u32,
    output: &Path,
    fps: u32,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(inputs.len() * 2 + 40);
    for input in inputs {
        args.push("-i".into());
        args.push(input.as_ref().into());
    }
    args.push("-filter_complex".into());
    args.push(tile_filter(layout, out_width, out_height).into());
    args.push("-map".into());
    args.push("[outv]".into());
    args.extend(encode_args(fps));
    args.push(output.into());
    args
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    // Try format-level duration first.
    if let Some(d) = &probe.format.duration {
        if let Ok(secs) = d.parse::<f64>() {
            return secs;
        }
    }
    // Fall back to the first video stream's duration.
    if let Some(stream) = first_video_stream(probe) {
        if let Some(d) = &stream.duration {
            if let Ok(secs) = d.parse::<f64>() {
                return secs;
            }
        }
    }
    0.0
}

/// Parse the video framerate from ffprobe output.
///
/// Prefers `avg_frame_rate`, falling back to `r_frame_rate` when the average
/// is missing or degenerate (`"0/0"`).
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    let Some(stream) = first_video_stream(probe) else {
        return 0.0;
    };
    [stream.avg_frame_rate.as_deref(), stream.r_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .map(parse_fraction)
        .find(|fps| *fps > 0.0)
        .unwrap_or(0.0)
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() == 2 {
        let num = parts[0].parse::<f64>().unwrap_or(0.0);
        let den = parts[1].parse::<f64>().unwrap_or(1.0);
        if den > 0.0 {
            return num / den;
        }
    }
    s.parse::<f64>().unwrap_or(0.0)
}

/// Find the first video stream's resolution.
pub fn parse_resolution(probe: &FfprobeOutput) -> (i32, i32) {
    first_video_stream(probe)
        .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
        .unwrap_or((0, 0))
}
