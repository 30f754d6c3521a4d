//! Graph and bookkeeping entities as they appear on the wire.
//!
//! All of these are transient, read-only copies of server-owned data. Fields
//! the client does not model are kept in a flattened map so nothing the
//! server sends is lost on the way to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// An entity in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Node {
    /// The label, or the id when the node has none.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// A directed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// Group discriminator of a [`GraphElement`] on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementGroup {
    Nodes,
    Edges,
}

/// One element of a neighborhood, path or query result.
///
/// On the wire this is `{"group": "nodes" | "edges", "data": {...}}`. When
/// `group` is missing the element is treated as an edge if its data has both
/// `source` and `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawElement", into = "RawElement")]
pub enum GraphElement {
    Node(Node),
    Edge(Edge),
}

impl GraphElement {
    pub fn group(&self) -> ElementGroup {
        match self {
            GraphElement::Node(_) => ElementGroup::Nodes,
            GraphElement::Edge(_) => ElementGroup::Edges,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            GraphElement::Node(node) => Some(node),
            GraphElement::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            GraphElement::Edge(edge) => Some(edge),
            GraphElement::Node(_) => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<ElementGroup>,
    data: Value,
}

impl TryFrom<RawElement> for GraphElement {
    type Error = String;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        let group = raw.group.unwrap_or_else(|| {
            let looks_like_edge = raw.data.get("source").is_some() && raw.data.get("target").is_some();
            if looks_like_edge {
                ElementGroup::Edges
            } else {
                ElementGroup::Nodes
            }
        });
        match group {
            ElementGroup::Nodes => serde_json::from_value(raw.data)
                .map(GraphElement::Node)
                .map_err(|e| format!("invalid node element: {e}")),
            ElementGroup::Edges => serde_json::from_value(raw.data)
                .map(GraphElement::Edge)
                .map_err(|e| format!("invalid edge element: {e}")),
        }
    }
}

impl From<GraphElement> for RawElement {
    fn from(element: GraphElement) -> Self {
        let group = Some(element.group());
        let data = match element {
            GraphElement::Node(node) => serde_json::to_value(node),
            GraphElement::Edge(edge) => serde_json::to_value(edge),
        }
        .unwrap_or(Value::Null);
        RawElement { group, data }
    }
}

/// An immutable record of a past action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuditEntry {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref()?)
    }
}

/// Node and edge totals, overall and per type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    #[serde(default)]
    pub node_count: u64,
    #[serde(default)]
    pub edge_count: u64,
    #[serde(default)]
    pub node_types: BTreeMap<String, u64>,
    #[serde(default)]
    pub edge_types: BTreeMap<String, u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphStats {
    /// Node types, most frequent first.
    pub fn node_types_by_count(&self) -> Vec<(&str, u64)> {
        sorted_by_count(&self.node_types)
    }

    /// Edge types, most frequent first.
    pub fn edge_types_by_count(&self) -> Vec<(&str, u64)> {
        sorted_by_count(&self.edge_types)
    }
}

fn sorted_by_count(counts: &BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

/// The account behind the configured credential.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parse a server timestamp (RFC 3339).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_keeps_extra_properties() {
        let node: Node = serde_json::from_value(json!({
            "id": "jeffrey_epstein",
            "label": "Jeffrey Epstein",
            "node_type": "Person",
            "notes": "financier",
            "born": 1953
        }))
        .unwrap();
        assert_eq!(node.display_label(), "Jeffrey Epstein");
        assert_eq!(node.node_type.as_deref(), Some("Person"));
        assert_eq!(node.properties["born"], 1953);
        assert!(!node.properties.contains_key("label"));
    }

    #[test]
    fn test_element_by_group() {
        let elements: Vec<GraphElement> = serde_json::from_value(json!([
            {"group": "nodes", "data": {"id": "a", "label": "A", "node_type": "Person"}},
            {"group": "edges", "data": {"id": "e1", "source": "a", "target": "b", "edge_type": "KNOWS"}}
        ]))
        .unwrap();
        assert_eq!(elements[0].group(), ElementGroup::Nodes);
        assert_eq!(elements[1].as_edge().unwrap().edge_type.as_deref(), Some("KNOWS"));
    }

    #[test]
    fn test_element_group_inferred() {
        let element: GraphElement =
            serde_json::from_value(json!({"data": {"source": "a", "target": "b"}})).unwrap();
        assert!(element.as_edge().is_some());

        let element: GraphElement = serde_json::from_value(json!({"data": {"id": "a"}})).unwrap();
        assert_eq!(element.as_node().unwrap().id, "a");
    }

    #[test]
    fn test_element_serializes_wire_shape() {
        let element = GraphElement::Node(Node {
            id: "a".into(),
            label: Some("A".into()),
            node_type: None,
            properties: Map::new(),
        });
        let value = serde_json::to_value(&element).unwrap();
        assert_eq!(value, json!({"group": "nodes", "data": {"id": "a", "label": "A"}}));
    }

    #[test]
    fn test_invalid_edge_element() {
        let result = serde_json::from_value::<GraphElement>(json!({"group": "edges", "data": {"id": "e"}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_sorted_by_count() {
        let stats: GraphStats = serde_json::from_value(json!({
            "nodeCount": 10,
            "edgeCount": 4,
            "nodeTypes": {"Location": 2, "Person": 7, "Event": 1},
            "edgeTypes": {}
        }))
        .unwrap();
        assert_eq!(stats.node_count, 10);
        assert_eq!(
            stats.node_types_by_count(),
            vec![("Person", 7), ("Location", 2), ("Event", 1)]
        );
        assert!(stats.edge_types_by_count().is_empty());
    }

    #[test]
    fn test_audit_entry_timestamp() {
        let entry: AuditEntry = serde_json::from_value(json!({
            "id": 17,
            "action": "proposal.approve",
            "userName": "mod",
            "targetNodeId": "n1",
            "createdAt": "2025-03-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(entry.user_name.as_deref(), Some("mod"));
        assert_eq!(entry.extra["id"], 17);
        let ts = entry.created_at_utc().unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_unparseable_timestamp() {
        assert!(parse_timestamp("yesterday").is_none());
    }
}
