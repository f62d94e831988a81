//! Discovery of embedded workflow graphs in container and stream tags.
//!
//! Generation tools store the workflow under a handful of tag names, either
//! as the graph JSON itself, as a JSON object wrapping it under `workflow`,
//! or inside a free-text `comment`/`description` blob. The first tag source
//! yielding something graph-shaped wins; sources are never merged.

use serde_json::{Map, Value};

use crate::ffmpeg::FfprobeOutput;

/// Tag names that hold the workflow directly, checked in order.
pub const DIRECT_WORKFLOW_KEYS: [&str; 5] = [
    "comfyui_workflow",
    "comfy_workflow",
    "workflow",
    "workflowjson",
    "workflow_json",
];

/// Free-text tag names that may embed a workflow blob, checked after the
/// direct keys.
pub const HINT_WORKFLOW_KEYS: [&str; 2] = ["comment", "description"];

/// Search one tag map for an embedded workflow graph.
///
/// Tag names are compared case-insensitively.
pub fn extract_workflow_from_tags(tags: &Map<String, Value>) -> Option<Value> {
    let lower: Map<String, Value> = tags
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();

    for key in DIRECT_WORKFLOW_KEYS {
        let Some(parsed) = lower.get(key).and_then(parse_maybe_json) else {
            continue;
        };
        if looks_like_graph(&parsed) {
            return Some(parsed);
        }
        if let Some(nested) = nested_workflow(&parsed) {
            return Some(nested);
        }
    }

    for key in HINT_WORKFLOW_KEYS {
        let Some(text) = lower.get(key).filter(|v| v.is_string()) else {
            continue;
        };
        let Some(parsed) = parse_maybe_json(text) else {
            continue;
        };
        if let Some(nested) = nested_workflow(&parsed) {
            return Some(nested);
        }
        if looks_like_graph(&parsed) {
            return Some(parsed);
        }
    }

    None
}

/// Search format-level tags, then each stream's tags, for a workflow graph.
pub fn discover_graph(probe: &FfprobeOutput) -> Option<Value> {
    std::iter::once(&probe.format.tags)
        .chain(probe.streams.iter().map(|s| &s.tags))
        .find_map(extract_workflow_from_tags)
}

/// A graph-shaped value carries a non-null `nodes` or `links` member.
fn looks_like_graph(value: &Value) -> bool {
    let present = |key: &str| value.get(key).is_some_and(is_truthy);
    value.is_object() && (present("nodes") || present("links"))
}

fn nested_workflow(value: &Value) -> Option<Value> {
    let inner = value.get("workflow").filter(|v| is_truthy(v))?;
    parse_maybe_json(inner).filter(looks_like_graph)
}

/// Objects pass through; strings are trimmed and parsed as JSON.
fn parse_maybe_json(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) => Some(value.clone()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                serde_json::from_str(trimmed).ok()
            }
        }
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
