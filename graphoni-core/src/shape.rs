//! Result shaping: turns raw server JSON into the two consumer shapes.
//!
//! * Tabular: a list of flat records (search hits, proposals, audit entries),
//!   passed through field-for-field.
//! * Graph: a list of tagged [`GraphElement`]s plus an optional summary
//!   (counts, path length).
//!
//! The two are told apart purely by envelope: a payload with an `elements`
//! key is a graph, a bare list or a `results` / `proposals` / `entries` list
//! is a table.
//!
//! Client operations return a [`Reply`], which keeps the server payload next
//! to its shaped form. Serializing a reply yields the payload untouched.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::Deref;

use crate::error::{GraphoniError, Result};
use crate::types::{Edge, GraphElement, Node};

/// List-valued wrapper fields recognised as tabular envelopes.
pub const LIST_KEYS: &[&str] = &["results", "proposals", "entries"];

/// Message used when the server reports no path without explaining why.
pub const NO_PATH_MESSAGE: &str = "No path found";

/// One flat record of a tabular result, passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    /// The display fields: the nested `data` object when the record is a
    /// graph element, otherwise the record itself.
    pub fn fields(&self) -> &Map<String, Value> {
        match self.0.get("data") {
            Some(Value::Object(inner)) => inner,
            _ => &self.0,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields().get(key)?.as_str()
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// The label, falling back to the id.
    pub fn label(&self) -> Option<&str> {
        self.get_str("label").or_else(|| self.id())
    }

    pub fn node_type(&self) -> Option<&str> {
        self.get_str("node_type")
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Element counts reported alongside a graph result.
///
/// Anything other than a plain total or an exact `{nodes, edges}` pair is
/// kept as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultCount {
    ByGroup(GroupCount),
    Total(u64),
    Other(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupCount {
    pub nodes: u64,
    pub edges: u64,
}

impl ResultCount {
    /// Node and edge counts, when the server reported them per group.
    pub fn by_group(&self) -> Option<GroupCount> {
        match self {
            ResultCount::ByGroup(counts) => Some(*counts),
            ResultCount::Total(_) | ResultCount::Other(_) => None,
        }
    }
}

/// A neighborhood, path, community or query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphResult {
    #[serde(default)]
    pub elements: Vec<GraphElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<ResultCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Counts by category computed from the elements of a [`GraphResult`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub node_types: BTreeMap<String, usize>,
    pub edge_types: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_length: Option<u64>,
}

impl GraphResult {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| GraphoniError::decode(format!("Invalid graph result: {e}")))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.elements.iter().filter_map(GraphElement::as_node)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.elements.iter().filter_map(GraphElement::as_edge)
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary {
            path_length: self.path_length,
            ..Default::default()
        };
        for element in &self.elements {
            match element {
                GraphElement::Node(node) => {
                    summary.nodes += 1;
                    let kind = node.node_type.clone().unwrap_or_else(|| "untyped".into());
                    *summary.node_types.entry(kind).or_default() += 1;
                }
                GraphElement::Edge(edge) => {
                    summary.edges += 1;
                    let kind = edge.edge_type.clone().unwrap_or_else(|| "untyped".into());
                    *summary.edge_types.entry(kind).or_default() += 1;
                }
            }
        }
        summary
    }
}

/// Outcome of a shortest-path search. Absence of a path is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PathResult {
    Found(GraphResult),
    NoPath { message: String },
}

impl PathResult {
    /// A payload without elements (or with an empty element list) means no
    /// path exists within the bound.
    pub fn from_value(value: Value) -> Result<Self> {
        let result = GraphResult::from_value(value)?;
        if result.is_empty() {
            let message = result
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| NO_PATH_MESSAGE.to_string());
            return Ok(PathResult::NoPath { message });
        }
        Ok(PathResult::Found(result))
    }

    pub fn elements(&self) -> &[GraphElement] {
        match self {
            PathResult::Found(result) => &result.elements,
            PathResult::NoPath { .. } => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PathResult::Found(_))
    }
}

impl Serialize for PathResult {
    /// `Found` serializes as the graph result; `NoPath` as the server's
    /// no-path envelope with an empty element list.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PathResult::Found(result) => result.serialize(serializer),
            PathResult::NoPath { message } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("path", &Value::Null)?;
                map.serialize_entry("elements", &Vec::<GraphElement>::new())?;
                map.serialize_entry("message", message)?;
                map.end()
            }
        }
    }
}

/// Any server payload classified by its envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped {
    Graph(GraphResult),
    Table(Vec<Record>),
    Object(Map<String, Value>),
    Scalar(Value),
}

impl Shaped {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(Shaped::Table(records(items)?)),
            Value::Object(map) if map.contains_key("elements") => {
                GraphResult::from_value(Value::Object(map)).map(Shaped::Graph)
            }
            Value::Object(mut map) => {
                let list_key = LIST_KEYS
                    .iter()
                    .find(|key| matches!(map.get(**key), Some(Value::Array(_))));
                match list_key.and_then(|key| map.remove(*key)) {
                    Some(Value::Array(items)) => Ok(Shaped::Table(records(items)?)),
                    _ => Ok(Shaped::Object(map)),
                }
            }
            other => Ok(Shaped::Scalar(other)),
        }
    }
}

/// A shaped result together with the server payload it was read from.
///
/// Derefs to the shaped value. Serializes as the payload, so JSON output
/// shows exactly what the server sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    raw: Value,
    value: T,
}

impl<T> Reply<T> {
    /// Shape `raw` with `shape`, keeping `raw` alongside the result.
    pub fn shape(raw: Value, shape: impl FnOnce(Value) -> Result<T>) -> Result<Self> {
        let value = shape(raw.clone())?;
        Ok(Self { raw, value })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: DeserializeOwned> Reply<T> {
    pub fn decode(raw: Value) -> Result<Self> {
        Self::shape(raw, |value| Ok(serde_json::from_value(value)?))
    }
}

impl<T> Deref for Reply<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> Serialize for Reply<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

fn records(items: Vec<Value>) -> Result<Vec<Record>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(Record(map)),
            other => Err(GraphoniError::decode(format!(
                "Expected a record object, got: {other}"
            ))),
        })
        .collect()
}

/// Unwrap a list-valued wrapper field (`results`, `proposals`, `entries`).
///
/// A missing or null field is an empty list; a bare array is accepted as-is.
pub fn unwrap_list(value: Value, key: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) => match map.remove(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(GraphoniError::decode(format!(
                "Expected `{key}` to be a list, got: {other}"
            ))),
        },
        other => Err(GraphoniError::decode(format!(
            "Expected an object with `{key}`, got: {other}"
        ))),
    }
}

/// Unwrap a list field and decode each item. The reply keeps the bare list.
pub fn decode_list<T: DeserializeOwned>(value: Value, key: &str) -> Result<Reply<Vec<T>>> {
    let items = Value::Array(unwrap_list(value, key)?);
    Reply::decode(items)
}

/// Take the entity out of a single-entity envelope such as `{"proposal": {...}}`,
/// or return the payload unchanged when it is not wrapped.
///
/// Sibling keys of the envelope (an apply report, for instance) are merged
/// into the entity unless it already has that key.
pub fn unwrap_entity(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut outer) => match outer.remove(key) {
            Some(Value::Object(mut inner)) => {
                for (sibling, field) in outer {
                    inner.entry(sibling).or_insert(field);
                }
                Value::Object(inner)
            }
            Some(other) => {
                outer.insert(key.to_string(), other);
                Value::Object(outer)
            }
            None => Value::Object(outer),
        },
        other => other,
    }
}
