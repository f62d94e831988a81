//! Geometry planning for composed exports.
//!
//! [`plan`] turns an absolute canvas size, a tiling mode and a clip count
//! into per-cell dimensions and per-clip offsets. Whether a user-supplied
//! resolution is a per-cell size or the final canvas is decided before
//! planning by [`effective_canvas`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How clips are arranged in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TilingMode {
    /// End-to-end in input order.
    Sequential,
    /// Simultaneously, tiled row-major into a grid.
    Grid,
}

impl TilingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Grid => "grid",
        }
    }
}

impl fmt::Display for TilingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TilingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sequential" => Ok(Self::Sequential),
            "grid" => Ok(Self::Grid),
            other => Err(CoreError::InvalidMode(other.to_string())),
        }
    }
}

/// How a clip is fitted into its cell. One policy per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitPolicy {
    /// Scale down to fit, pad the rest with black.
    Letterbox,
    /// Scale up to cover, crop the excess.
    CropToFill,
}

impl FitPolicy {
    /// Map the export form's `showBlackBars` flag.
    pub fn from_black_bars(show_black_bars: bool) -> Self {
        if show_black_bars {
            Self::Letterbox
        } else {
            Self::CropToFill
        }
    }
}

/// Meaning of the configured resolution in grid mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasPolicy {
    /// The resolution is the final canvas size.
    #[default]
    Absolute,
    /// The resolution is the size of one cell; the canvas grows with the grid.
    PerCell,
}

/// Top-left pixel position of a clip's cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellOffset {
    pub x: u32,
    pub y: u32,
}

/// Derived cell geometry for one export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    pub cell_width: u32,
    pub cell_height: u32,
    pub columns: u32,
    pub rows: u32,
    /// One offset per clip, in input order.
    pub offsets: Vec<CellOffset>,
}

impl GridLayout {
    fn cell_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Cells left for the background fill.
    pub fn unused_cells(&self) -> u32 {
        let used = u32::try_from(self.offsets.len()).unwrap_or(u32::MAX);
        self.cell_count().saturating_sub(used)
    }
}

/// `ceil(clip_count / columns)`, at least one row.
pub fn grid_rows(clip_count: usize, columns: u32) -> u32 {
    let columns = columns.max(1) as usize;
    let rows = clip_count.div_ceil(columns).max(1);
    u32::try_from(rows).unwrap_or(u32::MAX)
}

/// Plan cell geometry for an absolute canvas.
///
/// Sequential mode is a single canvas-sized cell shared by every clip in
/// turn. Grid mode places clip `i` at `(i % columns, i / columns)`.
pub fn plan(
    canvas_width: u32,
    canvas_height: u32,
    mode: TilingMode,
    clip_count: usize,
    columns: u32,
) -> GridLayout {
    match mode {
        TilingMode::Sequential => GridLayout {
            cell_width: canvas_width,
            cell_height: canvas_height,
            columns: 1,
            rows: 1,
            offsets: vec![CellOffset { x: 0, y: 0 }; clip_count],
        },
        TilingMode::Grid => {
            let columns = columns.max(1);
            let rows = grid_rows(clip_count, columns);
            let cell_width = canvas_width / columns;
            let cell_height = canvas_height / rows;

            let offsets = (0..clip_count)
                .map(|i| {
                    let i = u32::try_from(i).unwrap_or(u32::MAX);
                    CellOffset {
                        x: (i % columns) * cell_width,
                        y: (i / columns) * cell_height,
                    }
                })
                .collect();

            GridLayout {
                cell_width,
                cell_height,
                columns,
                rows,
                offsets,
            }
        }
    }
}

/// Resolve the absolute canvas for the planner.
///
/// With [`CanvasPolicy::PerCell`] in grid mode the base resolution is one
/// cell and is multiplied by the grid's columns and rows.
pub fn effective_canvas(
    base: (u32, u32),
    mode: TilingMode,
    columns: u32,
    clip_count: usize,
    policy: CanvasPolicy,
) -> (u32, u32) {
    match (mode, policy) {
        (TilingMode::Grid, CanvasPolicy::PerCell) => {
            let columns = columns.max(1);
            let rows = grid_rows(clip_count, columns);
            (
                base.0.saturating_mul(columns),
                base.1.saturating_mul(rows),
            )
        }
        _ => base,
    }
}
