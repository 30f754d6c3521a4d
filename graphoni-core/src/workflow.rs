//! Proposal workflow: building mutation proposals and driving reviews.
//!
//! Graph mutations are never written directly. Each one is submitted as a
//! [`ProposalRequest`] with a mandatory reason and waits in `pending` until a
//! reviewer approves or rejects it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::client::{GraphoniClient, path_segment};
use crate::error::{GraphoniError, Result};
use crate::proposal::{Proposal, ProposalKind, ProposalStatus, ReviewDecision};
use crate::shape::{Reply, decode_list, unwrap_entity};
use crate::transport::ApiRequest;

/// A graph mutation to propose, one variant per proposal type.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalRequest {
    AddNode {
        label: String,
        node_type: String,
        properties: Map<String, Value>,
    },
    EditNode {
        node_id: String,
        properties: Map<String, Value>,
    },
    DeleteNode {
        node_id: String,
    },
    AddEdge {
        source: String,
        target: String,
        edge_type: String,
        properties: Map<String, Value>,
    },
    EditEdge {
        edge_id: String,
        properties: Map<String, Value>,
    },
    DeleteEdge {
        edge_id: String,
    },
}

/// The body of `POST /api/proposals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPayload {
    #[serde(rename = "type")]
    pub kind: ProposalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_edge_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_after: Option<Map<String, Value>>,
    pub reason: String,
}

impl ProposalRequest {
    pub fn add_node(label: impl Into<String>, node_type: impl Into<String>) -> Self {
        ProposalRequest::AddNode {
            label: label.into(),
            node_type: node_type.into(),
            properties: Map::new(),
        }
    }

    pub fn edit_node(node_id: impl Into<String>, properties: Map<String, Value>) -> Self {
        ProposalRequest::EditNode {
            node_id: node_id.into(),
            properties,
        }
    }

    pub fn delete_node(node_id: impl Into<String>) -> Self {
        ProposalRequest::DeleteNode {
            node_id: node_id.into(),
        }
    }

    pub fn add_edge(
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: impl Into<String>,
    ) -> Self {
        ProposalRequest::AddEdge {
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
            properties: Map::new(),
        }
    }

    pub fn edit_edge(edge_id: impl Into<String>, properties: Map<String, Value>) -> Self {
        ProposalRequest::EditEdge {
            edge_id: edge_id.into(),
            properties,
        }
    }

    pub fn delete_edge(edge_id: impl Into<String>) -> Self {
        ProposalRequest::DeleteEdge {
            edge_id: edge_id.into(),
        }
    }

    /// Merge extra properties into an add or edit proposal. Deletions carry
    /// no properties and are returned unchanged.
    pub fn with_properties(mut self, extra: Map<String, Value>) -> Self {
        match &mut self {
            ProposalRequest::AddNode { properties, .. }
            | ProposalRequest::EditNode { properties, .. }
            | ProposalRequest::AddEdge { properties, .. }
            | ProposalRequest::EditEdge { properties, .. } => properties.extend(extra),
            ProposalRequest::DeleteNode { .. } | ProposalRequest::DeleteEdge { .. } => {}
        }
        self
    }

    pub fn kind(&self) -> ProposalKind {
        match self {
            ProposalRequest::AddNode { .. } => ProposalKind::AddNode,
            ProposalRequest::EditNode { .. } => ProposalKind::EditNode,
            ProposalRequest::DeleteNode { .. } => ProposalKind::DeleteNode,
            ProposalRequest::AddEdge { .. } => ProposalKind::AddEdge,
            ProposalRequest::EditEdge { .. } => ProposalKind::EditEdge,
            ProposalRequest::DeleteEdge { .. } => ProposalKind::DeleteEdge,
        }
    }

    /// Build the wire payload.
    ///
    /// The reason must be non-blank; it is never defaulted. Required ids and
    /// types must be non-blank too. For additions the explicit fields
    /// overwrite same-named keys in the extra properties.
    pub fn payload(&self, reason: &str) -> Result<ProposalPayload> {
        if reason.trim().is_empty() {
            return Err(GraphoniError::invalid_request(format!(
                "A reason is required for a {} proposal",
                self.kind()
            )));
        }

        let mut payload = ProposalPayload {
            kind: self.kind(),
            target_node_id: None,
            target_edge_id: None,
            data_after: None,
            reason: reason.to_string(),
        };

        match self {
            ProposalRequest::AddNode {
                label,
                node_type,
                properties,
            } => {
                let mut data = properties.clone();
                data.insert("label".into(), Value::String(required(label, "label")?));
                data.insert(
                    "node_type".into(),
                    Value::String(required(node_type, "node_type")?),
                );
                payload.data_after = Some(data);
            }
            ProposalRequest::EditNode {
                node_id,
                properties,
            } => {
                payload.target_node_id = Some(required(node_id, "node id")?);
                payload.data_after = Some(properties.clone());
            }
            ProposalRequest::DeleteNode { node_id } => {
                payload.target_node_id = Some(required(node_id, "node id")?);
            }
            ProposalRequest::AddEdge {
                source,
                target,
                edge_type,
                properties,
            } => {
                let mut data = properties.clone();
                data.insert("source".into(), Value::String(required(source, "source")?));
                data.insert("target".into(), Value::String(required(target, "target")?));
                data.insert(
                    "edge_type".into(),
                    Value::String(required(edge_type, "edge_type")?),
                );
                payload.data_after = Some(data);
            }
            ProposalRequest::EditEdge {
                edge_id,
                properties,
            } => {
                payload.target_edge_id = Some(required(edge_id, "edge id")?);
                payload.data_after = Some(properties.clone());
            }
            ProposalRequest::DeleteEdge { edge_id } => {
                payload.target_edge_id = Some(required(edge_id, "edge id")?);
            }
        }

        Ok(payload)
    }
}

fn required(value: &str, field: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(GraphoniError::invalid_request(format!(
            "{field} must not be empty"
        )));
    }
    Ok(value.to_string())
}

/// Listing filter for proposals. No status means every state.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalFilter {
    pub status: Option<ProposalStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ProposalFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl ProposalFilter {
    pub fn status(status: ProposalStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Decode a single proposal, unwrapping a `{"proposal": {...}}` envelope.
/// Envelope siblings end up in the proposal's `extra` map.
fn decode_proposal(value: Value) -> Result<Reply<Proposal>> {
    Reply::shape(unwrap_entity(value, "proposal"), |entity| {
        serde_json::from_value(entity)
            .map_err(|e| GraphoniError::decode(format!("Invalid proposal: {e}")))
    })
}

impl GraphoniClient {
    /// Submit a mutation proposal. It starts out `pending`.
    pub async fn propose(
        &self,
        request: &ProposalRequest,
        reason: &str,
    ) -> Result<Reply<Proposal>> {
        let payload = request.payload(reason)?;
        info!(kind = %payload.kind, "Submitting proposal");
        let body = serde_json::to_value(&payload)?;
        decode_proposal(self.call(ApiRequest::post("/api/proposals", body)).await?)
    }

    /// Proposals in server order (most recent first, typically).
    ///
    /// Rows with a state or type this client does not know are kept.
    pub async fn list_proposals(&self, filter: &ProposalFilter) -> Result<Reply<Vec<Proposal>>> {
        let request = ApiRequest::get("/api/proposals")
            .param_opt("status", filter.status)
            .param("limit", filter.limit)
            .param("offset", filter.offset);
        decode_list(self.call(request).await?, "proposals")
    }

    /// Fetch one proposal. Unknown ids fail with a 404 application error.
    pub async fn get_proposal(&self, id: &str) -> Result<Reply<Proposal>> {
        let path = format!("/api/proposals/{}", path_segment(id, "proposal id")?);
        decode_proposal(self.call(ApiRequest::get(path)).await?)
    }

    /// Request a review transition and return the proposal as the server
    /// reports it afterwards.
    ///
    /// The returned status is authoritative: for an approval it may already
    /// be `applied` or `failed`, or still `approved` if applying is deferred.
    pub async fn review(
        &self,
        id: &str,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> Result<Reply<Proposal>> {
        let path = format!("/api/proposals/{}", path_segment(id, "proposal id")?);
        let body = json!({
            "status": decision.target_status(),
            "reviewComment": comment.unwrap_or(""),
        });
        info!(proposal = id, %decision, "Reviewing proposal");

        let proposal = decode_proposal(self.call(ApiRequest::patch(path, body)).await?)?;
        let returned = proposal.status.unwrap_or(ProposalStatus::Unknown);
        if decision.outcome(returned).is_unexpected() {
            warn!(
                proposal = id,
                %decision,
                status = %returned,
                "Review returned a status the decision cannot lead to"
            );
        }
        Ok(proposal)
    }

    pub async fn approve(&self, id: &str, comment: Option<&str>) -> Result<Reply<Proposal>> {
        self.review(id, ReviewDecision::Approve, comment).await
    }

    pub async fn reject(&self, id: &str, comment: Option<&str>) -> Result<Reply<Proposal>> {
        self.review(id, ReviewDecision::Reject, comment).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_add_node_payload() {
        let request = ProposalRequest::add_node("Ghislaine Maxwell", "Person")
            .with_properties(props(json!({"nationality": "UK", "born": 1961})));
        let payload = serde_json::to_value(request.payload("court records").unwrap()).unwrap();
        assert_eq!(
            payload,
            json!({
                "type": "add-node",
                "dataAfter": {
                    "label": "Ghislaine Maxwell",
                    "node_type": "Person",
                    "nationality": "UK",
                    "born": 1961
                },
                "reason": "court records"
            })
        );
    }

    #[test]
    fn test_add_node_explicit_fields_win() {
        let request = ProposalRequest::add_node("Real", "Person")
            .with_properties(props(json!({"label": "Shadow"})));
        let payload = request.payload("r").unwrap();
        assert_eq!(payload.data_after.unwrap()["label"], "Real");
    }

    #[test]
    fn test_edit_and_delete_targets() {
        let edit = ProposalRequest::edit_node("n1", props(json!({"notes": "x"})))
            .payload("fix")
            .unwrap();
        assert_eq!(
            serde_json::to_value(edit).unwrap(),
            json!({"type": "edit-node", "targetNodeId": "n1", "dataAfter": {"notes": "x"}, "reason": "fix"})
        );

        let delete = ProposalRequest::delete_edge("e9").payload("dupe").unwrap();
        assert_eq!(
            serde_json::to_value(delete).unwrap(),
            json!({"type": "delete-edge", "targetEdgeId": "e9", "reason": "dupe"})
        );
    }

    #[test]
    fn test_add_edge_payload() {
        let payload = ProposalRequest::add_edge("a", "b", "KNOWS")
            .payload("photo")
            .unwrap();
        assert_eq!(payload.kind, ProposalKind::AddEdge);
        assert_eq!(
            Value::Object(payload.data_after.unwrap()),
            json!({"source": "a", "target": "b", "edge_type": "KNOWS"})
        );
        assert!(payload.target_node_id.is_none());
    }

    #[test]
    fn test_blank_reason_rejected_for_every_kind() {
        let requests = [
            ProposalRequest::add_node("l", "Person"),
            ProposalRequest::edit_node("n", Map::new()),
            ProposalRequest::delete_node("n"),
            ProposalRequest::add_edge("a", "b", "KNOWS"),
            ProposalRequest::edit_edge("e", Map::new()),
            ProposalRequest::delete_edge("e"),
        ];
        for request in requests {
            for reason in ["", "   "] {
                let err = request.payload(reason).unwrap_err();
                assert!(matches!(err, GraphoniError::InvalidRequest { .. }));
            }
        }
    }

    #[test]
    fn test_blank_target_rejected() {
        assert!(ProposalRequest::delete_node("").payload("r").is_err());
        assert!(ProposalRequest::add_node("x", " ").payload("r").is_err());
    }

    #[test]
    fn test_delete_ignores_properties() {
        let request = ProposalRequest::delete_node("n").with_properties(props(json!({"a": 1})));
        assert_eq!(request, ProposalRequest::delete_node("n"));
    }

    #[tokio::test]
    async fn test_propose_posts_payload() {
        let mock = Arc::new(MockTransport::with_response(json!({
            "proposal": {"id": "p1", "type": "delete-node", "status": "pending", "targetNodeId": "n1", "reason": "gone"}
        })));
        let client = GraphoniClient::new(mock.clone());

        let proposal = client
            .propose(&ProposalRequest::delete_node("n1"), "gone")
            .await
            .unwrap();
        assert_eq!(proposal.status, Some(ProposalStatus::Pending));

        let req = mock.last_request().unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path, "/api/proposals");
        assert_eq!(
            req.body,
            Some(json!({"type": "delete-node", "targetNodeId": "n1", "reason": "gone"}))
        );
    }

    #[tokio::test]
    async fn test_propose_without_reason_sends_nothing() {
        let mock = Arc::new(MockTransport::new());
        let client = GraphoniClient::new(mock.clone());
        let result = client.propose(&ProposalRequest::delete_node("n1"), "").await;
        assert!(result.is_err());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_proposals_filter() {
        let mock = Arc::new(MockTransport::with_response(json!({
            "proposals": [{"id": "p1", "type": "add-node", "status": "pending"}]
        })));
        let client = GraphoniClient::new(mock.clone());

        let list = client
            .list_proposals(&ProposalFilter::status(ProposalStatus::Pending).limit(10))
            .await
            .unwrap();
        assert_eq!(list.len(), 1);

        let req = mock.last_request().unwrap();
        assert_eq!(req.query_value("status"), Some("pending"));
        assert_eq!(req.query_value("limit"), Some("10"));
        assert_eq!(req.query_value("offset"), Some("0"));
    }

    #[tokio::test]
    async fn test_list_keeps_rows_in_unknown_states() {
        let mock = Arc::new(MockTransport::with_response(json!({
            "proposals": [
                {"id": "p1", "type": "add-node", "status": "pending", "reason": "new"},
                {"id": "p2", "type": "edit-node", "status": "archived"},
                {"id": "p3", "type": "split-node"}
            ]
        })));
        let client = GraphoniClient::new(mock.clone());

        let list = client.list_proposals(&ProposalFilter::default()).await.unwrap();
        let statuses: Vec<Option<ProposalStatus>> = list.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![Some(ProposalStatus::Pending), Some(ProposalStatus::Unknown), None]
        );
        assert_eq!(list[2].kind, ProposalKind::Unknown);
        assert_eq!(list.raw()[1]["status"], "archived");
    }

    #[tokio::test]
    async fn test_list_all_states_omits_status() {
        let mock = Arc::new(MockTransport::new());
        let client = GraphoniClient::new(mock.clone());
        assert!(client.list_proposals(&ProposalFilter::default()).await.unwrap().is_empty());
        assert_eq!(mock.last_request().unwrap().query_value("status"), None);
    }

    #[tokio::test]
    async fn test_approve_sends_patch_and_keeps_apply_report() {
        let mock = Arc::new(MockTransport::with_response(json!({
            "proposal": {"id": "p1", "type": "add-node", "status": "applied"},
            "applyResult": {"nodeId": "new_node"}
        })));
        let client = GraphoniClient::new(mock.clone());

        let proposal = client.approve("p1", None).await.unwrap();
        assert_eq!(proposal.status, Some(ProposalStatus::Applied));
        assert_eq!(proposal.extra["applyResult"]["nodeId"], "new_node");
        assert_eq!(
            serde_json::to_value(&proposal).unwrap(),
            json!({"id": "p1", "type": "add-node", "status": "applied", "applyResult": {"nodeId": "new_node"}})
        );

        let req = mock.last_request().unwrap();
        assert_eq!(req.method, Method::Patch);
        assert_eq!(req.path, "/api/proposals/p1");
        assert_eq!(
            req.body,
            Some(json!({"status": "approved", "reviewComment": ""}))
        );
    }

    #[tokio::test]
    async fn test_reject_with_comment() {
        let mock = Arc::new(MockTransport::with_response(json!({
            "id": "p2", "type": "edit-edge", "status": "rejected", "reviewComment": "no source"
        })));
        let client = GraphoniClient::new(mock.clone());

        let proposal = client.reject("p2", Some("no source")).await.unwrap();
        assert_eq!(proposal.review_comment.as_deref(), Some("no source"));
        assert_eq!(
            mock.last_request().unwrap().body,
            Some(json!({"status": "rejected", "reviewComment": "no source"}))
        );
    }

    #[tokio::test]
    async fn test_unexpected_review_status_is_returned() {
        let mock = Arc::new(MockTransport::with_response(json!({
            "id": "p3", "type": "add-node", "status": "pending"
        })));
        let client = GraphoniClient::new(mock.clone());
        let proposal = client.approve("p3", Some("ok")).await.unwrap();
        assert_eq!(proposal.status, Some(ProposalStatus::Pending));
    }

    #[tokio::test]
    async fn test_review_reply_without_status() {
        let mock = Arc::new(MockTransport::with_response(json!({"id": "p4", "type": "add-node"})));
        let client = GraphoniClient::new(mock.clone());
        let proposal = client.reject("p4", None).await.unwrap();
        assert_eq!(proposal.status, None);
        assert_eq!(
            serde_json::to_value(&proposal).unwrap(),
            json!({"id": "p4", "type": "add-node"})
        );
    }

    #[tokio::test]
    async fn test_get_proposal_not_found() {
        let mock = Arc::new(MockTransport::new());
        mock.queue_error(GraphoniError::from_response(
            404,
            r#"{"error": "proposal not found"}"#,
        ));
        let client = GraphoniClient::new(mock.clone());

        let err = client.get_proposal("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "HTTP 404: proposal not found");
    }
}
