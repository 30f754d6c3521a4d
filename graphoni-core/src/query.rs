//! The four-variant complex query sent to `POST /api/graph/query`.
//!
//! Each variant owns its own fields, so a payload can never mix the fields of
//! two variants. Interpretation is entirely server-side; this module only
//! shapes the body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::{GraphoniError, Result};

/// A complex graph query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// Nodes matching type and property filters, optionally around a center node.
    #[serde(rename_all = "camelCase")]
    Structured {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_types: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filters: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        center_node: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hops: Option<i64>,
    },
    /// A query-language string passed through verbatim.
    #[serde(rename = "cypher")]
    Raw { cypher: String },
    /// Free-text search.
    Search { q: String },
    /// Members of a server-computed community.
    #[serde(rename_all = "camelCase")]
    Community {
        community_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<i64>,
    },
}

/// Variant tag of a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Structured,
    Raw,
    Search,
    Community,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Structured => "structured",
            QueryKind::Raw => "cypher",
            QueryKind::Search => "search",
            QueryKind::Community => "community",
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = GraphoniError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(QueryKind::Structured),
            "cypher" | "raw" => Ok(QueryKind::Raw),
            "search" => Ok(QueryKind::Search),
            "community" => Ok(QueryKind::Community),
            other => Err(GraphoniError::invalid_request(format!(
                "Unknown query type '{other}' (expected structured, cypher, search or community)"
            ))),
        }
    }
}

/// Loose query arguments as they arrive from a tool call or command line,
/// before they are checked against a variant.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryParts {
    pub node_types: Option<Vec<String>>,
    pub filters: Option<Map<String, Value>>,
    pub center_node: Option<String>,
    pub hops: Option<i64>,
    pub cypher: Option<String>,
    pub q: Option<String>,
    pub community_id: Option<String>,
    pub level: Option<i64>,
}

impl QueryParts {
    /// Names of the fields that are set, paired with the variant they belong to.
    fn present(&self) -> Vec<(&'static str, QueryKind)> {
        let fields = [
            ("node_types", QueryKind::Structured, self.node_types.is_some()),
            ("filters", QueryKind::Structured, self.filters.is_some()),
            ("center_node", QueryKind::Structured, self.center_node.is_some()),
            ("hops", QueryKind::Structured, self.hops.is_some()),
            ("cypher", QueryKind::Raw, self.cypher.is_some()),
            ("q", QueryKind::Search, self.q.is_some()),
            ("community_id", QueryKind::Community, self.community_id.is_some()),
            ("level", QueryKind::Community, self.level.is_some()),
        ];
        fields
            .into_iter()
            .filter(|(_, _, set)| *set)
            .map(|(name, kind, _)| (name, kind))
            .collect()
    }
}

#[derive(Serialize)]
struct QueryBody<'a> {
    #[serde(flatten)]
    query: &'a Query,
    limit: i64,
}

impl Query {
    /// An unfiltered structured query; narrow it with the struct fields.
    pub fn structured() -> Self {
        Query::Structured {
            node_types: None,
            filters: None,
            center_node: None,
            hops: None,
        }
    }

    pub fn cypher(statement: impl Into<String>) -> Self {
        Query::Raw {
            cypher: statement.into(),
        }
    }

    pub fn search(text: impl Into<String>) -> Self {
        Query::Search { q: text.into() }
    }

    pub fn community(community_id: impl Into<String>, level: Option<i64>) -> Self {
        Query::Community {
            community_id: community_id.into(),
            level,
        }
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            Query::Structured { .. } => QueryKind::Structured,
            Query::Raw { .. } => QueryKind::Raw,
            Query::Search { .. } => QueryKind::Search,
            Query::Community { .. } => QueryKind::Community,
        }
    }

    /// Build a variant from loose arguments.
    ///
    /// Fails when a field of another variant is set, or when the variant's
    /// required field (`cypher`, `q`, `community_id`) is missing.
    pub fn from_parts(kind: QueryKind, parts: QueryParts) -> Result<Self> {
        let foreign: Vec<&str> = parts
            .present()
            .into_iter()
            .filter(|(_, owner)| *owner != kind)
            .map(|(name, _)| name)
            .collect();
        if !foreign.is_empty() {
            return Err(GraphoniError::invalid_request(format!(
                "Fields not valid for a {kind} query: {}",
                foreign.join(", ")
            )));
        }

        let missing = |field: &str| {
            GraphoniError::invalid_request(format!("A {kind} query requires `{field}`"))
        };

        match kind {
            QueryKind::Structured => Ok(Query::Structured {
                node_types: parts.node_types,
                filters: parts.filters,
                center_node: parts.center_node,
                hops: parts.hops,
            }),
            QueryKind::Raw => parts
                .cypher
                .map(|cypher| Query::Raw { cypher })
                .ok_or_else(|| missing("cypher")),
            QueryKind::Search => parts
                .q
                .map(|q| Query::Search { q })
                .ok_or_else(|| missing("q")),
            QueryKind::Community => parts
                .community_id
                .map(|community_id| Query::Community {
                    community_id,
                    level: parts.level,
                })
                .ok_or_else(|| missing("community_id")),
        }
    }

    /// The request body: the variant's fields, its `type` tag and `limit`.
    pub fn payload(&self, limit: i64) -> Result<Value> {
        Ok(serde_json::to_value(QueryBody { query: self, limit })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_structured_payload_skips_unset_fields() {
        let query = Query::Structured {
            node_types: Some(vec!["Person".into()]),
            filters: None,
            center_node: Some("jeffrey_epstein".into()),
            hops: Some(2),
        };
        assert_eq!(
            query.payload(5000).unwrap(),
            json!({
                "type": "structured",
                "nodeTypes": ["Person"],
                "centerNode": "jeffrey_epstein",
                "hops": 2,
                "limit": 5000
            })
        );
    }

    #[test]
    fn test_raw_payload_is_verbatim() {
        let statement = "MATCH (n) WHERE n.label = 'x' RETURN n";
        let payload = Query::cypher(statement).payload(10).unwrap();
        assert_eq!(payload, json!({"type": "cypher", "cypher": statement, "limit": 10}));
    }

    #[test]
    fn test_search_and_community_payloads() {
        assert_eq!(
            Query::search("Maxwell").payload(0).unwrap(),
            json!({"type": "search", "q": "Maxwell", "limit": 0})
        );
        assert_eq!(
            Query::community("c7", Some(1)).payload(-1).unwrap(),
            json!({"type": "community", "communityId": "c7", "level": 1, "limit": -1})
        );
        assert_eq!(
            Query::community("c7", None).payload(50).unwrap(),
            json!({"type": "community", "communityId": "c7", "limit": 50})
        );
    }

    #[test]
    fn test_deserialize_wire_form() {
        let query: Query =
            serde_json::from_value(json!({"type": "community", "communityId": "c1"})).unwrap();
        assert_eq!(query, Query::community("c1", None));
        assert_eq!(query.kind(), QueryKind::Community);
    }

    #[test]
    fn test_from_parts_rejects_mixture() {
        let parts = QueryParts {
            cypher: Some("MATCH (n) RETURN n".into()),
            q: Some("epstein".into()),
            ..Default::default()
        };
        let err = Query::from_parts(QueryKind::Raw, parts).unwrap_err();
        assert!(matches!(err, GraphoniError::InvalidRequest { .. }));
        assert!(err.to_string().contains("q"));
    }

    #[test]
    fn test_from_parts_requires_variant_field() {
        let err = Query::from_parts(QueryKind::Community, QueryParts::default()).unwrap_err();
        assert!(err.to_string().contains("community_id"));
    }

    #[test]
    fn test_from_parts_structured() {
        let parts = QueryParts {
            filters: Some(json!({"nationality": "US"}).as_object().unwrap().clone()),
            hops: Some(0),
            ..Default::default()
        };
        let query = Query::from_parts(QueryKind::Structured, parts).unwrap();
        assert_eq!(
            query.payload(100).unwrap(),
            json!({"type": "structured", "filters": {"nationality": "US"}, "hops": 0, "limit": 100})
        );
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("cypher".parse::<QueryKind>().unwrap(), QueryKind::Raw);
        assert_eq!("Raw".parse::<QueryKind>().unwrap(), QueryKind::Raw);
        assert_eq!(" community ".parse::<QueryKind>().unwrap(), QueryKind::Community);
        assert!("graphql".parse::<QueryKind>().is_err());
    }
}
