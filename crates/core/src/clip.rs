//! Clip analysis: probe, workflow discovery, field resolution.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ffmpeg::{probe_video, FfmpegError, FfmpegTools, ProbeSummary};
use crate::filter::{filter, FieldFilterConfig};
use crate::graph::{Graph, ResolvedFieldMap};
use crate::workflow_tags::discover_graph;

/// Which projection of the stored graph a descriptor's fields carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldView {
    /// Every input and widget value.
    #[default]
    Fields,
    /// One representative value per named node output.
    Outputs,
}

/// Everything known about one analyzed clip.
///
/// The wire field names match what the review client stores and sends back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    pub file_path: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fps: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Compact JSON of the embedded workflow graph, if one was found.
    #[serde(rename = "workflowNorm", default)]
    pub graph: Option<String>,
    #[serde(rename = "widgetValues", default)]
    pub fields: ResolvedFieldMap,
}

impl ClipDescriptor {
    pub fn parsed_graph(&self) -> Option<Graph> {
        self.graph.as_deref().and_then(Graph::parse_str)
    }

    /// Recompute the field map from the stored graph under a new allow-list.
    ///
    /// Clips without a graph keep whatever map they carry.
    pub fn refresh_fields(&mut self, config: &FieldFilterConfig, view: FieldView) {
        if let Some(graph) = self.parsed_graph() {
            let resolved = match view {
                FieldView::Fields => graph.resolve(),
                FieldView::Outputs => graph.resolve_outputs(),
            };
            self.fields = filter(&resolved, config);
        }
    }

    pub fn created_at_epoch(&self) -> f64 {
        self.created_at
            .map(|t| t.timestamp_micros() as f64 / 1_000_000.0)
            .unwrap_or(0.0)
    }
}

/// Result of [`analyze_clip`]. Analysis never fails outright; a probe error
/// is reported alongside a descriptor with zeroed dimensions.
#[derive(Debug)]
pub struct ClipAnalysis {
    pub descriptor: ClipDescriptor,
    pub probe_error: Option<FfmpegError>,
}

/// Probe a clip, discover its embedded workflow and resolve it.
pub async fn analyze_clip(tools: &FfmpegTools, path: &Path, name: &str) -> ClipAnalysis {
    let (summary, graph, probe_error) = match probe_video(tools, path).await {
        Ok(probe) => (ProbeSummary::from_probe(&probe), discover_graph(&probe), None),
        Err(e) => (ProbeSummary::default(), None, Some(e)),
    };

    let (size, created_at) = match tokio::fs::metadata(path).await {
        Ok(meta) => {
            let created = meta
                .created()
                .or_else(|_| meta.modified())
                .ok()
                .map(DateTime::<Utc>::from);
            (meta.len(), created)
        }
        Err(_) => (0, None),
    };

    let fields = graph
        .as_ref()
        .map(crate::graph::resolve)
        .unwrap_or_default();

    let descriptor = ClipDescriptor {
        file_path: name.to_string(),
        name: name.to_string(),
        size,
        duration: summary.duration,
        width: summary.width,
        height: summary.height,
        fps: summary.fps.round(),
        created_at,
        graph: graph.map(|g| g.to_string()),
        fields,
    };

    ClipAnalysis {
        descriptor,
        probe_error,
    }
}
