//! Export configuration: defaults, form coercion and layout planning.
//!
//! Export options arrive as loose text fields. Unparseable numbers fall back
//! to documented defaults and are reported as [`ConfigFallback`]s so the
//! caller can log them; only an unknown tiling mode is rejected.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::graph::{display_value, Graph, ResolvedFieldMap};
use crate::layout::{effective_canvas, plan, CanvasPolicy, FitPolicy, GridLayout, TilingMode};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_GRID_COLUMNS: u32 = 2;
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_RESOLUTION: (u32, u32) = (1920, 1080);

/// Output container extension and MIME type.
pub const OUTPUT_EXTENSION: &str = "mp4";
pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

// ---------------------------------------------------------------------------
// Resolution parsing
// ---------------------------------------------------------------------------

/// Parse a `"WIDTHxHEIGHT"` string. Both dimensions must be non-zero.
pub fn parse_resolution_str(s: &str) -> Result<(u32, u32), CoreError> {
    let parts: Vec<&str> = s.trim().split('x').collect();
    if parts.len() != 2 {
        return Err(CoreError::Validation(format!(
            "Invalid resolution format '{s}': expected WIDTHxHEIGHT"
        )));
    }
    let width = parts[0]
        .trim()
        .parse::<u32>()
        .map_err(|_| CoreError::Validation(format!("Invalid width in resolution '{s}'")))?;
    let height = parts[1]
        .trim()
        .parse::<u32>()
        .map_err(|_| CoreError::Validation(format!("Invalid height in resolution '{s}'")))?;
    if width == 0 || height == 0 {
        return Err(CoreError::Validation(format!(
            "Resolution dimensions must be > 0, got '{s}'"
        )));
    }
    Ok((width, height))
}

// ---------------------------------------------------------------------------
// Export config
// ---------------------------------------------------------------------------

/// Validated options for one export job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    pub mode: TilingMode,
    /// Grid columns, at least 1. Ignored in sequential mode.
    pub columns: u32,
    /// Configured resolution; see `canvas_policy` for its meaning.
    pub resolution: (u32, u32),
    pub fps: u32,
    pub fit: FitPolicy,
    pub burn_in_labels: bool,
    /// Field keys shown in labels, in display order.
    pub label_fields: Vec<String>,
    pub canvas_policy: CanvasPolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mode: TilingMode::Sequential,
            columns: DEFAULT_GRID_COLUMNS,
            resolution: DEFAULT_RESOLUTION,
            fps: DEFAULT_FPS,
            // An omitted `showBlackBars` means crop.
            fit: FitPolicy::CropToFill,
            burn_in_labels: false,
            label_fields: Vec::new(),
            canvas_policy: CanvasPolicy::Absolute,
        }
    }
}

impl ExportConfig {
    /// Absolute output canvas for `clip_count` clips.
    pub fn canvas(&self, clip_count: usize) -> (u32, u32) {
        effective_canvas(
            self.resolution,
            self.mode,
            self.columns,
            clip_count,
            self.canvas_policy,
        )
    }

    /// Cell geometry for `clip_count` clips on the effective canvas.
    pub fn layout(&self, clip_count: usize) -> GridLayout {
        let (width, height) = self.canvas(clip_count);
        plan(width, height, self.mode, clip_count, self.columns)
    }
}

/// Raw text fields of an export request.
#[derive(Debug, Clone, Default)]
pub struct ExportForm {
    pub mode: Option<String>,
    pub grid_columns: Option<String>,
    pub show_black_bars: Option<String>,
    pub show_filename: Option<String>,
    pub resolution: Option<String>,
    pub fps: Option<String>,
    /// JSON array of field keys.
    pub label_fields: Option<String>,
    pub resolution_per_cell: Option<String>,
}

impl ExportForm {
    /// Store a multipart text field by its wire name. Returns `false` for
    /// names that are not export options.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "mode" => &mut self.mode,
            "gridColumns" => &mut self.grid_columns,
            "showBlackBars" => &mut self.show_black_bars,
            "showFilename" => &mut self.show_filename,
            "resolution" => &mut self.resolution,
            "fps" => &mut self.fps,
            "labelFields" => &mut self.label_fields,
            "resolutionPerCell" => &mut self.resolution_per_cell,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// Fields available to one clip's label, read from an uploaded workflow
/// document.
///
/// The document is normally `{ "widgetValues": { key: value } }`. A raw
/// workflow graph is resolved instead. Anything else, including invalid
/// JSON, yields an empty map.
pub fn workflow_fields(payload: &[u8]) -> ResolvedFieldMap {
    let Ok(doc) = serde_json::from_slice::<Value>(payload) else {
        return ResolvedFieldMap::new();
    };
    match doc.get("widgetValues") {
        Some(Value::Object(values)) => ResolvedFieldMap::from_values(values.clone()),
        _ => Graph::parse(&doc).map(|g| g.resolve()).unwrap_or_default(),
    }
}

/// A form value that could not be used and was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFallback {
    pub field: &'static str,
    pub raw: String,
    pub default: String,
}

impl fmt::Display for ConfigFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}='{}' unusable, using {}", self.field, self.raw, self.default)
    }
}

/// Coerce raw form fields into an [`ExportConfig`].
///
/// A missing mode means sequential; an unknown mode is an error. Every other
/// field degrades to its default.
pub fn coerce_export_form(form: &ExportForm) -> Result<(ExportConfig, Vec<ConfigFallback>), CoreError> {
    let mode = match non_blank(&form.mode) {
        Some(raw) => raw.parse::<TilingMode>()?,
        None => TilingMode::Sequential,
    };

    let mut fallbacks = Vec::new();
    let mut fallback = |field: &'static str, raw: &str, default: String| {
        fallbacks.push(ConfigFallback {
            field,
            raw: raw.to_string(),
            default,
        });
    };

    let columns = match non_blank(&form.grid_columns) {
        None => DEFAULT_GRID_COLUMNS,
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) => u32::try_from(n.max(1)).unwrap_or(u32::MAX),
            Err(_) => {
                fallback("gridColumns", raw, DEFAULT_GRID_COLUMNS.to_string());
                DEFAULT_GRID_COLUMNS
            }
        },
    };

    let fps = match non_blank(&form.fps) {
        None => DEFAULT_FPS,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                fallback("fps", raw, DEFAULT_FPS.to_string());
                DEFAULT_FPS
            }
        },
    };

    let resolution = match non_blank(&form.resolution) {
        None => DEFAULT_RESOLUTION,
        Some(raw) => parse_resolution_str(raw).unwrap_or_else(|_| {
            let (w, h) = DEFAULT_RESOLUTION;
            fallback("resolution", raw, format!("{w}x{h}"));
            DEFAULT_RESOLUTION
        }),
    };

    let label_fields = match non_blank(&form.label_fields) {
        None => Vec::new(),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items.iter().map(display_value).collect(),
            _ => {
                fallback("labelFields", raw, "[]".to_string());
                Vec::new()
            }
        },
    };

    let config = ExportConfig {
        mode,
        columns,
        resolution,
        fps,
        fit: FitPolicy::from_black_bars(is_true(&form.show_black_bars)),
        burn_in_labels: is_true(&form.show_filename),
        label_fields,
        canvas_policy: if is_true(&form.resolution_per_cell) {
            CanvasPolicy::PerCell
        } else {
            CanvasPolicy::Absolute
        },
    };

    Ok((config, fallbacks))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn is_true(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim) == Some("true")
}
