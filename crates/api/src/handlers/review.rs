//! Row review: headers, hiding, search, sort and diffs over analyzed clips.
//!
//! Stateless. The client sends the items it got from `/analyze` together
//! with its current view settings and gets back the computed table.

use axum::Json;
use clipgrid_core::clip::{ClipDescriptor, FieldView};
use clipgrid_core::filter::{node_type_catalog, FieldFilterConfig, NodeTypeSummary};
use clipgrid_core::graph::Graph;
use clipgrid_core::table::{
    build_headers, diff_view, filter_rows, sort_rows, visible_headers, HideSpec, RowDiff,
    SortDirection, SortKey,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReviewSort {
    #[serde(default)]
    pub key: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub items: Vec<ClipDescriptor>,
    /// Comma-separated hide tokens: substrings or `/regex/flags`.
    #[serde(default)]
    pub hide_spec: String,
    #[serde(default)]
    pub hide_paths: bool,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: ReviewSort,
    /// When present, every item's fields are re-resolved from its stored
    /// workflow under this allow-list.
    #[serde(default)]
    pub filter: Option<FieldFilterConfig>,
    /// `outputs` re-resolves every item into its per-output view.
    #[serde(default)]
    pub view: FieldView,
    /// Narrows the node-type catalog.
    #[serde(default)]
    pub node_type_search: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub headers: Vec<String>,
    pub visible_headers: Vec<String>,
    pub rows: Vec<ClipDescriptor>,
    pub diffs: Vec<RowDiff>,
    pub node_types: Vec<NodeTypeSummary>,
}

/// POST /review
pub async fn review(Json(req): Json<ReviewRequest>) -> AppResult<Json<ReviewResponse>> {
    let mut items = req.items;
    let refresh = match (req.filter, req.view) {
        (Some(config), _) => Some(config),
        (None, FieldView::Outputs) => Some(FieldFilterConfig::disabled()),
        (None, FieldView::Fields) => None,
    };
    if let Some(config) = &refresh {
        for item in &mut items {
            item.refresh_fields(config, req.view);
        }
    }

    let headers = build_headers(&items);
    let hide = HideSpec::parse(&req.hide_spec);
    let visible = visible_headers(&headers, &hide, req.hide_paths);

    // Search covers hidden columns too.
    let mut rows = filter_rows(&items, &headers, &req.search);
    sort_rows(&mut rows, req.sort.key, req.sort.direction);
    let diffs = diff_view(&rows, &visible);

    let graphs: Vec<Graph> = items.iter().filter_map(ClipDescriptor::parsed_graph).collect();
    let node_types = node_type_catalog(&graphs, &req.node_type_search);

    tracing::debug!(
        items = items.len(),
        rows = rows.len(),
        headers = headers.len(),
        visible = visible.len(),
        view = ?req.view,
        sort_key = ?req.sort.key,
        direction = %req.sort.direction,
        "Review computed",
    );

    Ok(Json(ReviewResponse {
        rows: rows.into_iter().cloned().collect(),
        headers,
        visible_headers: visible,
        diffs,
        node_types,
    }))
}
