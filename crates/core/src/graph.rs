//! Node-graph workflow resolution.
//!
//! A generation workflow is embedded in a clip as a JSON graph of `nodes`
//! and `links`. Nodes come in two shapes (a `type` tag or a `class_type`
//! tag); [`Graph::parse`] normalizes both into one canonical [`GraphNode`]
//! so the resolver only ever sees a single shape.
//!
//! [`resolve`] flattens a graph into a [`ResolvedFieldMap`] keyed by
//! `"<node ident>.<field>"`. Link references are followed exactly one hop:
//! an input linked to another node takes that node's first non-empty widget
//! value and is never resolved further, so malformed cyclic graphs cannot
//! cause unbounded traversal.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Type name used when a node carries neither `type` nor `class_type`.
pub const UNKNOWN_TYPE: &str = "UnknownType";

/// Placeholder used in identifiers for nodes without an integer id.
const UNKNOWN_ID: &str = "UnknownID";

/// Input name used when a declared input has no `name`.
const DEFAULT_INPUT_NAME: &str = "input";

/// Array-form links are `[id, src_node, src_slot, dst_node, dst_slot, ...]`.
const MIN_LINK_ARRAY_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Canonical graph shape
// ---------------------------------------------------------------------------

/// Where a declared node input gets its value from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// Connected to another node through the link with this id.
    Link(i64),
    /// A literal value stored on the input itself.
    Literal(Value),
    /// Neither a usable link nor a literal value.
    Unconnected,
}

/// A declared input on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphInput {
    pub name: String,
    pub source: InputSource,
}

/// A declared output on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOutput {
    pub name: Option<String>,
    pub slot_index: Option<i64>,
}

impl GraphOutput {
    /// Output name, falling back to `out_<slot>`.
    pub fn display_name(&self) -> String {
        match (&self.name, self.slot_index) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(slot)) => format!("out_{slot}"),
            _ => "out_".to_string(),
        }
    }
}

/// A node normalized from either the `type` or the `class_type` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Integer node id. Nodes without one are kept but cannot be link sources.
    pub id: Option<i64>,
    /// Canonical node type.
    pub node_type: String,
    pub title: Option<String>,
    pub inputs: Vec<GraphInput>,
    /// Positional, untyped widget values.
    pub widgets: Vec<Value>,
    pub outputs: Vec<GraphOutput>,
}

impl GraphNode {
    /// Normalize a raw JSON node. Returns `None` for non-object entries.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;

        let node_type = obj
            .get("type")
            .and_then(non_empty_str)
            .or_else(|| obj.get("class_type").and_then(non_empty_str))
            .unwrap_or(UNKNOWN_TYPE)
            .to_string();

        let title = obj
            .get("title")
            .and_then(non_empty_str)
            .map(str::to_string);

        let inputs = obj
            .get("inputs")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_input).collect())
            .unwrap_or_default();

        let widgets = obj
            .get("widgets_values")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let outputs = obj
            .get("outputs")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|o| GraphOutput {
                        name: o.get("name").and_then(Value::as_str).map(str::to_string),
                        slot_index: o.get("slot_index").and_then(Value::as_i64),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: obj.get("id").and_then(Value::as_i64),
            node_type,
            title,
            inputs,
            widgets,
            outputs,
        })
    }

    /// Human-readable identifier: `title (type #id)` when a distinct title
    /// exists, otherwise `type #id`.
    pub fn ident(&self) -> String {
        let id = self
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| UNKNOWN_ID.to_string());
        match &self.title {
            Some(title) if *title != self.node_type => {
                format!("{title} ({} #{id})", self.node_type)
            }
            _ => format!("{} #{id}", self.node_type),
        }
    }

    /// The node's representative value: its first non-empty widget value,
    /// or the first widget value when all of them are empty.
    pub fn representative_widget(&self) -> Option<&Value> {
        self.widgets
            .iter()
            .find(|v| !v.is_null() && !display_value(v).is_empty())
            .or_else(|| self.widgets.first())
    }
}

/// A directed edge from a producer node's output slot to a consumer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphLink {
    pub id: i64,
    pub source_node: i64,
    pub source_slot: Option<i64>,
}

impl GraphLink {
    /// Parse either the array form or the object form of a link.
    pub fn from_value(raw: &Value) -> Option<Self> {
        match raw {
            Value::Array(row) if row.len() >= MIN_LINK_ARRAY_LEN => Some(Self {
                id: row[0].as_i64()?,
                source_node: row[1].as_i64()?,
                source_slot: row[2].as_i64(),
            }),
            Value::Object(obj) => Some(Self {
                id: obj.get("id")?.as_i64()?,
                source_node: obj.get("origin_id")?.as_i64()?,
                source_slot: obj.get("origin_slot").and_then(Value::as_i64),
            }),
            _ => None,
        }
    }
}

/// A parsed workflow graph with nodes sorted by ascending id.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    links: HashMap<i64, GraphLink>,
    node_index: HashMap<i64, usize>,
}

impl Graph {
    /// Parse a raw graph. Returns `None` unless both `nodes` and `links`
    /// are arrays.
    pub fn parse(raw: &Value) -> Option<Self> {
        let nodes_raw = raw.get("nodes")?.as_array()?;
        let links_raw = raw.get("links")?.as_array()?;

        let mut nodes: Vec<GraphNode> = nodes_raw.iter().filter_map(GraphNode::from_value).collect();
        nodes.sort_by_key(|n| n.id.unwrap_or(0));

        let links = links_raw
            .iter()
            .filter_map(GraphLink::from_value)
            .map(|l| (l.id, l))
            .collect();

        let node_index = nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, n)| n.id.map(|id| (id, idx)))
            .collect();

        Some(Self {
            nodes,
            links,
            node_index,
        })
    }

    /// Parse a graph from a JSON string payload.
    pub fn parse_str(payload: &str) -> Option<Self> {
        serde_json::from_str::<Value>(payload)
            .ok()
            .and_then(|v| Self::parse(&v))
    }

    pub fn node(&self, id: i64) -> Option<&GraphNode> {
        self.node_index.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn link(&self, id: i64) -> Option<&GraphLink> {
        self.links.get(&id)
    }

    /// Follow a link one hop and return the producer's value.
    ///
    /// Never recurses into the producer's own inputs.
    fn resolve_link(&self, link_id: i64) -> Option<Value> {
        let link = self.link(link_id)?;
        let source = self.node(link.source_node)?;
        Some(match source.representative_widget() {
            Some(value) => normalize_value(value),
            None => Value::String(source.ident()),
        })
    }

    /// Flatten every input and widget value into a field map.
    pub fn resolve(&self) -> ResolvedFieldMap {
        let mut map = ResolvedFieldMap::new();

        for node in &self.nodes {
            let ident = node.ident();

            for input in &node.inputs {
                let value = match &input.source {
                    InputSource::Link(link_id) => self.resolve_link(*link_id),
                    InputSource::Literal(value) => Some(normalize_value(value)),
                    InputSource::Unconnected => None,
                };
                if let Some(value) = value {
                    map.insert(
                        format!("{ident}.inputs.{}", input.name),
                        value,
                        Some(FieldProvenance::new(node, FieldKind::Input)),
                    );
                }
            }

            for (i, widget) in node.widgets.iter().enumerate() {
                map.insert(
                    format!("{ident}.widgets_values[{i}]"),
                    normalize_value(widget),
                    Some(FieldProvenance::new(node, FieldKind::Widget)),
                );
            }
        }

        map
    }

    /// Compact per-output view: each named output of a node carrying widget
    /// values maps to the node's representative widget value.
    pub fn resolve_outputs(&self) -> ResolvedFieldMap {
        let mut map = ResolvedFieldMap::new();

        for node in &self.nodes {
            if node.outputs.is_empty() {
                continue;
            }
            let Some(value) = node.representative_widget() else {
                continue;
            };
            let value = normalize_value(value);
            let ident = node.ident();
            for output in &node.outputs {
                map.insert(
                    format!("{ident}.{}", output.display_name()),
                    value.clone(),
                    Some(FieldProvenance::new(node, FieldKind::Output)),
                );
            }
        }

        map
    }
}

/// Resolve a raw graph value. Malformed graphs yield an empty map.
pub fn resolve(raw: &Value) -> ResolvedFieldMap {
    Graph::parse(raw).map(|g| g.resolve()).unwrap_or_default()
}

/// Resolve a graph from its serialized JSON. Malformed payloads yield an
/// empty map.
pub fn resolve_str(payload: &str) -> ResolvedFieldMap {
    Graph::parse_str(payload)
        .map(|g| g.resolve())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Resolved field map
// ---------------------------------------------------------------------------

/// Which part of a node a field was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Input,
    Widget,
    Output,
}

/// The node a resolved field belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProvenance {
    pub node_id: Option<i64>,
    pub node_type: String,
    pub kind: FieldKind,
}

impl FieldProvenance {
    fn new(node: &GraphNode, kind: FieldKind) -> Self {
        Self {
            node_id: node.id,
            node_type: node.node_type.clone(),
            kind,
        }
    }
}

/// A single resolved value plus where it came from.
///
/// Provenance is `None` for fields supplied as a plain key/value map (for
/// example per-clip label data uploaded with an export request).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub value: Value,
    pub provenance: Option<FieldProvenance>,
}

/// Flat `key → scalar` view of a graph, ordered by key.
///
/// Serializes as a plain JSON object of values; provenance stays in-process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFieldMap {
    fields: BTreeMap<String, ResolvedField>,
}

impl ResolvedFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from plain values without provenance.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut map = Self::new();
        for (key, value) in values {
            let value = normalize_value(&value);
            map.insert(key, value, None);
        }
        map
    }

    pub fn insert(&mut self, key: String, value: Value, provenance: Option<FieldProvenance>) {
        self.fields.insert(key, ResolvedField { value, provenance });
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).map(|f| &f.value)
    }

    pub fn field(&self, key: &str) -> Option<&ResolvedField> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedField)> {
        self.fields.iter()
    }

    /// Keep only fields matching the predicate.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &ResolvedField) -> bool,
    {
        self.fields.retain(|k, f| keep(k, f));
    }
}

impl Serialize for ResolvedFieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, field) in &self.fields {
            map.serialize_entry(key, &field.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResolvedFieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_values(values))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Widget => "widget",
            Self::Output => "output",
        })
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Collapse objects and arrays into their compact JSON text so every stored
/// value is a scalar. Labels and diffs both compare this form.
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

/// String coercion used for display and comparison. `null` becomes `""`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn parse_input(raw: &Value) -> Option<GraphInput> {
    let obj = raw.as_object()?;
    let name = obj
        .get("name")
        .and_then(non_empty_str)
        .unwrap_or(DEFAULT_INPUT_NAME)
        .to_string();

    let source = match obj.get("link") {
        Some(link) if !link.is_null() => link
            .as_i64()
            .map(InputSource::Link)
            .unwrap_or(InputSource::Unconnected),
        _ => match obj.get("value") {
            Some(value) => InputSource::Literal(value.clone()),
            None => InputSource::Unconnected,
        },
    };

    Some(GraphInput { name, source })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn two_node_graph() -> Value {
        json!({
            "nodes": [
                {
                    "id": 2,
                    "type": "KSampler",
                    "inputs": [{ "name": "seed", "link": 7 }],
                    "widgets_values": [123, "euler"]
                },
                {
                    "id": 1,
                    "type": "PrimitiveNode",
                    "title": "Seed",
                    "outputs": [{ "name": "INT", "slot_index": 0 }],
                    "widgets_values": ["X"]
                }
            ],
            "links": [[7, 1, 0, 2, 0, "INT"]]
        })
    }

    // -- Identifiers --

    #[test]
    fn ident_without_title() {
        let node = GraphNode::from_value(&json!({ "id": 3, "type": "KSampler" })).unwrap();
        assert_eq!(node.ident(), "KSampler #3");
    }

    #[test]
    fn ident_with_distinct_title() {
        let node =
            GraphNode::from_value(&json!({ "id": 4, "class_type": "KSampler", "title": "Main" }))
                .unwrap();
        assert_eq!(node.ident(), "Main (KSampler #4)");
    }

    #[test]
    fn ident_ignores_title_equal_to_type() {
        let node =
            GraphNode::from_value(&json!({ "id": 4, "type": "KSampler", "title": "KSampler" }))
                .unwrap();
        assert_eq!(node.ident(), "KSampler #4");
    }

    #[test]
    fn ident_defaults_for_missing_type_and_id() {
        let node = GraphNode::from_value(&json!({})).unwrap();
        assert_eq!(node.ident(), "UnknownType #UnknownID");
    }

    #[test]
    fn type_tag_wins_over_class_type() {
        let node =
            GraphNode::from_value(&json!({ "id": 1, "type": "A", "class_type": "B" })).unwrap();
        assert_eq!(node.node_type, "A");
    }

    // -- Resolution --

    #[test]
    fn linked_input_takes_source_widget_value() {
        let map = resolve(&two_node_graph());
        assert_eq!(map.get("KSampler #2.inputs.seed"), Some(&json!("X")));
    }

    #[test]
    fn every_widget_value_is_emitted() {
        let map = resolve(&two_node_graph());
        assert_eq!(map.get("KSampler #2.widgets_values[0]"), Some(&json!(123)));
        assert_eq!(map.get("KSampler #2.widgets_values[1]"), Some(&json!("euler")));
        assert_eq!(map.get("Seed (PrimitiveNode #1).widgets_values[0]"), Some(&json!("X")));
    }

    #[test]
    fn provenance_records_owning_node_type() {
        let map = resolve(&two_node_graph());
        let field = map.field("KSampler #2.inputs.seed").unwrap();
        let prov = field.provenance.as_ref().unwrap();
        assert_eq!(prov.node_type, "KSampler");
        assert_eq!(prov.node_id, Some(2));
        assert_eq!(prov.kind, FieldKind::Input);
    }

    #[test]
    fn link_skips_empty_widget_values() {
        let graph = json!({
            "nodes": [
                { "id": 1, "type": "Src", "widgets_values": [null, "", "third"] },
                { "id": 2, "type": "Dst", "inputs": [{ "name": "x", "link": 1 }] }
            ],
            "links": [[1, 1, 0, 2, 0]]
        });
        let map = resolve(&graph);
        assert_eq!(map.get("Dst #2.inputs.x"), Some(&json!("third")));
    }

    #[test]
    fn link_to_node_without_widgets_uses_source_ident() {
        let graph = json!({
            "nodes": [
                { "id": 1, "type": "VAELoader", "title": "My VAE" },
                { "id": 2, "type": "VAEDecode", "inputs": [{ "name": "vae", "link": 9 }] }
            ],
            "links": [[9, 1, 0, 2, 1, "VAE"]]
        });
        let map = resolve(&graph);
        assert_eq!(
            map.get("VAEDecode #2.inputs.vae"),
            Some(&json!("My VAE (VAELoader #1)"))
        );
    }

    #[test]
    fn unresolvable_link_contributes_no_field() {
        let graph = json!({
            "nodes": [
                { "id": 2, "type": "Dst", "inputs": [
                    { "name": "missing_link", "link": 99 },
                    { "name": "missing_node", "link": 5 },
                    { "name": "unlinked", "link": null }
                ] }
            ],
            "links": [[5, 42, 0, 2, 0]]
        });
        let map = resolve(&graph);
        assert!(map.is_empty());
    }

    #[test]
    fn literal_input_value_is_emitted() {
        let graph = json!({
            "nodes": [
                { "id": 1, "type": "Note", "inputs": [{ "name": "text", "value": "hello" }] }
            ],
            "links": []
        });
        let map = resolve(&graph);
        assert_eq!(map.get("Note #1.inputs.text"), Some(&json!("hello")));
    }

    #[test]
    fn object_values_are_serialized_compactly_in_source_order() {
        let graph = json!({
            "nodes": [
                { "id": 1, "type": "Lora", "widgets_values": [{ "on": true, "lora": "a.safetensors", "strength": 0.8 }] },
                { "id": 2, "type": "Dst", "inputs": [{ "name": "lora", "link": 3 }] }
            ],
            "links": [[3, 1, 0, 2, 0]]
        });
        let map = resolve(&graph);
        let expected = json!("{\"on\":true,\"lora\":\"a.safetensors\",\"strength\":0.8}");
        assert_eq!(map.get("Lora #1.widgets_values[0]"), Some(&expected));
        assert_eq!(map.get("Dst #2.inputs.lora"), Some(&expected));
    }

    #[test]
    fn parsed_payload_keeps_object_key_order() {
        let payload = r#"{"nodes":[{"id":4,"type":"Lora","widgets_values":[{"on":true,"lora":"a.safetensors","strength":0.8}]}],"links":[]}"#;
        let map = resolve_str(payload);
        assert_eq!(
            map.get("Lora #4.widgets_values[0]"),
            Some(&json!(r#"{"on":true,"lora":"a.safetensors","strength":0.8}"#))
        );
    }

    #[test]
    fn object_form_links_are_accepted() {
        let graph = json!({
            "nodes": [
                { "id": 1, "type": "Src", "widgets_values": [5] },
                { "id": 2, "type": "Dst", "inputs": [{ "name": "steps", "link": 11 }] }
            ],
            "links": [{ "id": 11, "origin_id": 1, "origin_slot": 0, "target_id": 2, "target_slot": 0 }]
        });
        let map = resolve(&graph);
        assert_eq!(map.get("Dst #2.inputs.steps"), Some(&json!(5)));
    }

    #[test]
    fn cyclic_links_resolve_single_hop() {
        let graph = json!({
            "nodes": [
                { "id": 1, "type": "A", "inputs": [{ "name": "in", "link": 2 }], "widgets_values": ["a"] },
                { "id": 2, "type": "B", "inputs": [{ "name": "in", "link": 1 }], "widgets_values": ["b"] }
            ],
            "links": [[1, 1, 0, 2, 0], [2, 2, 0, 1, 0]]
        });
        let map = resolve(&graph);
        assert_eq!(map.get("A #1.inputs.in"), Some(&json!("b")));
        assert_eq!(map.get("B #2.inputs.in"), Some(&json!("a")));
    }

    #[test]
    fn self_link_resolves_to_own_widget() {
        let graph = json!({
            "nodes": [
                { "id": 1, "type": "Loop", "inputs": [{ "name": "in", "link": 1 }] }
            ],
            "links": [[1, 1, 0, 1, 0]]
        });
        let map = resolve(&graph);
        assert_eq!(map.get("Loop #1.inputs.in"), Some(&json!("Loop #1")));
    }

    // -- Fail-soft parsing --

    #[test]
    fn missing_links_yields_empty_map() {
        let map = resolve(&json!({ "nodes": [{ "id": 1, "type": "A", "widgets_values": [1] }] }));
        assert!(map.is_empty());
    }

    #[test]
    fn missing_nodes_yields_empty_map() {
        assert!(resolve(&json!({ "links": [] })).is_empty());
    }

    #[test]
    fn malformed_payload_yields_empty_map() {
        assert!(resolve_str("{not json").is_empty());
        assert!(resolve_str("[1,2,3]").is_empty());
        assert!(resolve_str("").is_empty());
    }

    #[test]
    fn resolve_str_matches_resolve() {
        let raw = two_node_graph();
        assert_eq!(resolve_str(&raw.to_string()), resolve(&raw));
    }

    // -- Outputs view --

    fn resolve_outputs(raw: &Value) -> ResolvedFieldMap {
        Graph::parse(raw).unwrap().resolve_outputs()
    }

    #[test]
    fn outputs_map_to_representative_widget() {
        let map = resolve_outputs(&two_node_graph());
        assert_eq!(map.get("Seed (PrimitiveNode #1).INT"), Some(&json!("X")));
        // KSampler #2 declares no outputs.
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn unnamed_outputs_fall_back_to_slot() {
        let graph = json!({
            "nodes": [
                { "id": 1, "type": "Src", "outputs": [{ "slot_index": 3 }], "widgets_values": [1] }
            ],
            "links": []
        });
        let map = resolve_outputs(&graph);
        assert_eq!(map.get("Src #1.out_3"), Some(&json!(1)));
    }

    // -- Serialization --

    #[test]
    fn field_map_serializes_as_flat_object() {
        let map = resolve(&two_node_graph());
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["KSampler #2.inputs.seed"], "X");
    }

    #[test]
    fn field_map_deserializes_without_provenance() {
        let map: ResolvedFieldMap =
            serde_json::from_value(json!({ "a": 1, "b": { "nested": true } })).unwrap();
        assert_eq!(map.get("a"), Some(&json!(1)));
        assert_eq!(map.get("b"), Some(&json!("{\"nested\":true}")));
        assert!(map.field("a").unwrap().provenance.is_none());
    }

    #[test]
    fn display_value_coerces_null_to_empty() {
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!(1.5)), "1.5");
        assert_eq!(display_value(&json!("s")), "s");
        assert_eq!(display_value(&json!(true)), "true");
    }
}
