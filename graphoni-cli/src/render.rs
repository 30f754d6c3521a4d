//! Terminal rendering of command results.
//!
//! Each function returns the full text to print, one line per entry.

use graphoni_core::{AuditEntry, GraphElement, GraphStats, PathResult, Proposal, Record, ResultCount};
use serde_json::{Map, Value};

/// Entries of a nested list shown before the listing is cut short.
const LIST_PREVIEW: usize = 5;

pub fn search(results: &[Record]) -> String {
    results
        .iter()
        .map(|record| {
            format!(
                "  {}  ({})  [{}]\n",
                record.label().unwrap_or("?"),
                record.node_type().unwrap_or_default(),
                record.id().unwrap_or_default()
            )
        })
        .collect()
}

pub fn path(result: &PathResult) -> String {
    let found = match result {
        PathResult::NoPath { message } => return format!("{message}\n"),
        PathResult::Found(found) => found,
    };

    let length = found
        .path_length
        .map_or_else(|| "?".to_string(), |l| l.to_string());
    let (nodes, edges) = match found.count.as_ref().and_then(ResultCount::by_group) {
        Some(counts) => (counts.nodes as usize, counts.edges as usize),
        None => {
            let summary = found.summary();
            (summary.nodes, summary.edges)
        }
    };

    let mut out = format!("Path length: {length} ({nodes} nodes, {edges} edges)\n");
    for element in &found.elements {
        match element {
            GraphElement::Node(node) => out.push_str(&format!(
                "  [{}] {}\n",
                node.node_type.as_deref().unwrap_or_default(),
                node.display_label()
            )),
            GraphElement::Edge(edge) => out.push_str(&format!(
                "  --{}-->\n",
                edge.edge_type.as_deref().unwrap_or_default()
            )),
        }
    }
    out
}

pub fn stats(stats: &GraphStats) -> String {
    let mut out = format!("Nodes: {}\nEdges: {}\n", stats.node_count, stats.edge_count);
    for (heading, counts) in [
        ("Node types", stats.node_types_by_count()),
        ("Edge types", stats.edge_types_by_count()),
    ] {
        if counts.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{heading}:\n"));
        for (name, count) in counts {
            out.push_str(&format!("  {name}: {count}\n"));
        }
    }
    out
}

pub fn proposals(proposals: &[Proposal]) -> String {
    proposals
        .iter()
        .map(|p| {
            let status = p.status.map_or_else(|| "?".to_string(), |s| s.to_string());
            format!(
                "  [{status}] {} by {} — {}  ({}...)\n",
                p.kind,
                p.author_name.as_deref().unwrap_or("?"),
                p.reason.as_deref().unwrap_or_default(),
                p.short_id()
            )
        })
        .collect()
}

pub fn audit(entries: &[AuditEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            let action = if e.action.is_empty() { "?" } else { &e.action };
            format!(
                "  {}  {}  by {}  node={}\n",
                e.created_at.as_deref().unwrap_or_default(),
                action,
                e.user_name.as_deref().unwrap_or("?"),
                e.target_node_id.as_deref().unwrap_or_default()
            )
        })
        .collect()
}

/// Recursive key/value listing for anything without a dedicated layout.
pub fn value(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(map) => write_object(&mut out, map, 0),
                    other => out.push_str(&format!("{}\n", scalar(other))),
                }
            }
        }
        Value::Object(map) => write_object(&mut out, map, 0),
        other => out.push_str(&format!("{}\n", scalar(other))),
    }
    out
}

fn write_object(out: &mut String, map: &Map<String, Value>, indent: usize) {
    let prefix = "  ".repeat(indent);
    for (key, val) in map {
        match val {
            Value::Object(inner) => {
                out.push_str(&format!("{prefix}{key}:\n"));
                write_object(out, inner, indent + 1);
            }
            Value::Array(items) if matches!(items.first(), Some(Value::Object(_))) => {
                out.push_str(&format!("{prefix}{key}: ({} items)\n", items.len()));
                for item in items.iter().take(LIST_PREVIEW) {
                    match item {
                        Value::Object(inner) => write_object(out, inner, indent + 1),
                        other => out.push_str(&format!("{prefix}  {}\n", scalar(other))),
                    }
                    out.push('\n');
                }
                if items.len() > LIST_PREVIEW {
                    out.push_str(&format!(
                        "{prefix}  ... and {} more\n",
                        items.len() - LIST_PREVIEW
                    ));
                }
            }
            other => out.push_str(&format!("{prefix}{key}: {}\n", scalar(other))),
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphoni_core::GraphResult;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_search_lines() {
        let hits = records(json!([
            {"data": {"id": "jeffrey_epstein", "label": "Jeffrey Epstein", "node_type": "Person"}},
            {"id": "unnamed_1"}
        ]));
        assert_eq!(
            search(&hits),
            "  Jeffrey Epstein  (Person)  [jeffrey_epstein]\n  unnamed_1  ()  [unnamed_1]\n"
        );
    }

    #[test]
    fn test_path_found() {
        let result = PathResult::from_value(json!({
            "elements": [
                {"group": "nodes", "data": {"id": "a", "label": "Alice", "node_type": "Person"}},
                {"group": "edges", "data": {"source": "a", "target": "b", "edge_type": "KNOWS"}},
                {"group": "nodes", "data": {"id": "b", "node_type": "Person"}}
            ],
            "pathLength": 1,
            "count": {"nodes": 2, "edges": 1}
        }))
        .unwrap();
        assert_eq!(
            path(&result),
            "Path length: 1 (2 nodes, 1 edges)\n  [Person] Alice\n  --KNOWS-->\n  [Person] b\n"
        );
    }

    #[test]
    fn test_path_counts_elements_without_server_count() {
        let result = PathResult::Found(
            GraphResult::from_value(json!({
                "elements": [{"group": "nodes", "data": {"id": "a"}}]
            }))
            .unwrap(),
        );
        assert_eq!(path(&result), "Path length: ? (1 nodes, 0 edges)\n  [] a\n");
    }

    #[test]
    fn test_path_total_count_falls_back_to_elements() {
        let result = PathResult::from_value(json!({
            "elements": [{"group": "nodes", "data": {"id": "a", "label": "A"}}],
            "pathLength": 0,
            "count": {"total": 1}
        }))
        .unwrap();
        assert_eq!(path(&result), "Path length: 0 (1 nodes, 0 edges)\n  [] A\n");
    }

    #[test]
    fn test_no_path_prints_message() {
        let result = PathResult::from_value(json!({
            "path": null,
            "message": "No path found within 6 hops"
        }))
        .unwrap();
        assert_eq!(path(&result), "No path found within 6 hops\n");
    }

    #[test]
    fn test_stats_sorted_descending() {
        let s: GraphStats = serde_json::from_value(json!({
            "nodeCount": 3,
            "edgeCount": 2,
            "nodeTypes": {"Organization": 1, "Person": 2},
            "edgeTypes": {}
        }))
        .unwrap();
        assert_eq!(
            stats(&s),
            "Nodes: 3\nEdges: 2\n\nNode types:\n  Person: 2\n  Organization: 1\n"
        );
    }

    #[test]
    fn test_proposal_lines() {
        let list: Vec<Proposal> = serde_json::from_value(json!([{
            "id": "0f3c9a12-7d4e-4b1a-9c55-1e2f3a4b5c6d",
            "type": "add-node",
            "status": "pending",
            "reason": "Court filing 2019",
            "authorName": "alice"
        }]))
        .unwrap();
        assert_eq!(
            proposals(&list),
            "  [pending] add-node by alice — Court filing 2019  (0f3c9a12...)\n"
        );
    }

    #[test]
    fn test_proposal_line_with_missing_fields() {
        let list: Vec<Proposal> = serde_json::from_value(json!([
            {"id": "p1", "type": "delete-node"},
            {"id": "p2", "type": "add-node", "status": "archived", "reason": "r"}
        ]))
        .unwrap();
        assert_eq!(
            proposals(&list),
            "  [?] delete-node by ? —   (p1...)\n  [unknown] add-node by ? — r  (p2...)\n"
        );
    }

    #[test]
    fn test_audit_lines() {
        let entries: Vec<AuditEntry> = serde_json::from_value(json!([{
            "action": "approve",
            "userName": "mod",
            "targetNodeId": "n1",
            "createdAt": "2026-03-01T12:00:00Z"
        }, {}]))
        .unwrap();
        assert_eq!(
            audit(&entries),
            "  2026-03-01T12:00:00Z  approve  by mod  node=n1\n    ?  by ?  node=\n"
        );
    }

    #[test]
    fn test_generic_listing_truncates_lists() {
        let items: Vec<Value> = (0..7).map(|i| json!({"n": i})).collect();
        let rendered = value(&json!({
            "data": {"label": "X"},
            "id": "p1",
            "items": items,
            "tags": []
        }));
        let mut expected = String::from("data:\n  label: X\nid: p1\nitems: (7 items)\n");
        for i in 0..5 {
            expected.push_str(&format!("  n: {i}\n\n"));
        }
        expected.push_str("  ... and 2 more\ntags: []\n");
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_generic_scalar() {
        assert_eq!(value(&json!("done")), "done\n");
        assert_eq!(value(&json!(null)), "null\n");
    }
}
