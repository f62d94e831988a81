//! Node-type allow-list applied to resolved field maps.
//!
//! The allow-list is ordinary configuration owned by the caller and passed
//! into every call. Filtering consults each field's recorded provenance,
//! never the composite key text.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, ResolvedFieldMap};

/// Node types whose fields are shown when filtering is on and the caller
/// supplies no list of its own.
pub const DEFAULT_ALLOWED_NODE_TYPES: [&str; 10] = [
    "KSampler",
    "KSamplerAdvanced",
    "LoraLoaderModelOnly",
    "CR Apply LoRA Stack",
    "Power Lora Loader (rgthree)",
    "ClownsharKSampler_Beta",
    "CheckpointLoaderSimple",
    "WanVideoLoraSelect",
    "WanVideoSampler",
    "WanVideoTextEncode",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilterConfig {
    pub allowed_types: BTreeSet<String>,
    pub enabled: bool,
}

impl Default for FieldFilterConfig {
    fn default() -> Self {
        Self {
            allowed_types: DEFAULT_ALLOWED_NODE_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            enabled: true,
        }
    }
}

impl FieldFilterConfig {
    /// A config that lets every field through.
    pub fn disabled() -> Self {
        Self {
            allowed_types: BTreeSet::new(),
            enabled: false,
        }
    }

    pub fn allows(&self, node_type: &str) -> bool {
        !self.enabled || self.allowed_types.contains(node_type)
    }
}

/// Restrict a resolved map to fields produced by allowed node types.
///
/// Fields without provenance are dropped while filtering is enabled.
pub fn filter(fields: &ResolvedFieldMap, config: &FieldFilterConfig) -> ResolvedFieldMap {
    if !config.enabled {
        return fields.clone();
    }
    let mut kept = fields.clone();
    kept.retain(|_, field| {
        field
            .provenance
            .as_ref()
            .is_some_and(|p| config.allowed_types.contains(&p.node_type))
    });
    kept
}

/// One entry of the node-type catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeSummary {
    pub node_type: String,
    /// Number of graphs containing at least one node of this type.
    pub files: usize,
    /// Sorted, de-duplicated output names seen on nodes of this type.
    pub outputs: Vec<String>,
}

/// Catalog the node types present across a set of graphs.
///
/// `search` is a case-insensitive substring match on the type name. The
/// result is sorted by type.
pub fn node_type_catalog<'a, I>(graphs: I, search: &str) -> Vec<NodeTypeSummary>
where
    I: IntoIterator<Item = &'a Graph>,
{
    let mut acc: BTreeMap<String, (usize, BTreeSet<String>)> = BTreeMap::new();

    for graph in graphs {
        let mut seen: HashSet<&str> = HashSet::new();
        for node in &graph.nodes {
            let entry = acc.entry(node.node_type.clone()).or_default();
            if seen.insert(node.node_type.as_str()) {
                entry.0 += 1;
            }
            entry.1.extend(
                node.outputs
                    .iter()
                    .filter_map(|o| o.name.clone())
                    .filter(|name| !name.is_empty()),
            );
        }
    }

    let term = search.trim().to_lowercase();
    acc.into_iter()
        .filter(|(node_type, _)| term.is_empty() || node_type.to_lowercase().contains(&term))
        .map(|(node_type, (files, outputs))| NodeTypeSummary {
            node_type,
            files,
            outputs: outputs.into_iter().collect(),
        })
        .collect()
}
