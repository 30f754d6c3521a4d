//! Proposal lifecycle types.
//!
//! ```text
//! pending ──approve──▶ approved ──apply──▶ applied
//!    │                     └──────apply──▶ failed
//!    └──reject──▶ rejected
//! ```
//!
//! A client can only request the two transitions out of `pending`; `applied`
//! and `failed` are reported by the server after an approval triggers an
//! apply attempt.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::{GraphoniError, Result};
use crate::types::parse_timestamp;

/// One of the six mutation types.
///
/// A type this client does not know decodes as `Unknown`, so one odd row
/// does not spoil a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalKind {
    AddNode,
    EditNode,
    DeleteNode,
    AddEdge,
    EditEdge,
    DeleteEdge,
    #[serde(other)]
    Unknown,
}

impl ProposalKind {
    pub const ALL: [ProposalKind; 6] = [
        ProposalKind::AddNode,
        ProposalKind::EditNode,
        ProposalKind::DeleteNode,
        ProposalKind::AddEdge,
        ProposalKind::EditEdge,
        ProposalKind::DeleteEdge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalKind::AddNode => "add-node",
            ProposalKind::EditNode => "edit-node",
            ProposalKind::DeleteNode => "delete-node",
            ProposalKind::AddEdge => "add-edge",
            ProposalKind::EditEdge => "edit-edge",
            ProposalKind::DeleteEdge => "delete-edge",
            ProposalKind::Unknown => "unknown",
        }
    }

    /// Wire name of the target field, or `None` for additions.
    pub fn target_field(&self) -> Option<&'static str> {
        match self {
            ProposalKind::AddNode | ProposalKind::AddEdge | ProposalKind::Unknown => None,
            ProposalKind::EditNode | ProposalKind::DeleteNode => Some("targetNodeId"),
            ProposalKind::EditEdge | ProposalKind::DeleteEdge => Some("targetEdgeId"),
        }
    }

    /// Whether the proposal carries a `dataAfter` property set.
    pub fn carries_data(&self) -> bool {
        matches!(
            self,
            ProposalKind::AddNode
                | ProposalKind::EditNode
                | ProposalKind::AddEdge
                | ProposalKind::EditEdge
        )
    }
}

impl std::fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a proposal.
///
/// `Unknown` stands for any state the server reports that is not listed
/// here. It never transitions and is not terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
    Applied,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 5] = [
        ProposalStatus::Pending,
        ProposalStatus::Approved,
        ProposalStatus::Rejected,
        ProposalStatus::Applied,
        ProposalStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Applied => "applied",
            ProposalStatus::Failed => "failed",
            ProposalStatus::Unknown => "unknown",
        }
    }

    /// States reachable in one step.
    pub fn successors(&self) -> &'static [ProposalStatus] {
        match self {
            ProposalStatus::Pending => &[ProposalStatus::Approved, ProposalStatus::Rejected],
            ProposalStatus::Approved => &[ProposalStatus::Applied, ProposalStatus::Failed],
            ProposalStatus::Rejected
            | ProposalStatus::Applied
            | ProposalStatus::Failed
            | ProposalStatus::Unknown => &[],
        }
    }

    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Rejected | ProposalStatus::Applied | ProposalStatus::Failed
        )
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = GraphoniError;

    fn from_str(s: &str) -> Result<Self> {
        ProposalStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                GraphoniError::invalid_request(format!(
                    "Unknown proposal status '{s}' (expected pending, approved, rejected, applied or failed)"
                ))
            })
    }
}

/// The two transitions a reviewer can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// What a review actually led to, read from the status the server returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Approved; the apply attempt has not been reported yet.
    Approved,
    /// Approved and applied to the graph.
    Applied,
    /// Approved, but applying the change failed.
    ApplyFailed,
    Rejected,
    /// The server returned a status the decision cannot lead to.
    Unexpected(ProposalStatus),
}

impl ReviewDecision {
    pub fn target_status(&self) -> ProposalStatus {
        match self {
            ReviewDecision::Approve => ProposalStatus::Approved,
            ReviewDecision::Reject => ProposalStatus::Rejected,
        }
    }

    /// Classify the status returned by the server after this decision.
    pub fn outcome(&self, returned: ProposalStatus) -> ReviewOutcome {
        match (self, returned) {
            (ReviewDecision::Approve, ProposalStatus::Approved) => ReviewOutcome::Approved,
            (ReviewDecision::Approve, ProposalStatus::Applied) => ReviewOutcome::Applied,
            (ReviewDecision::Approve, ProposalStatus::Failed) => ReviewOutcome::ApplyFailed,
            (ReviewDecision::Reject, ProposalStatus::Rejected) => ReviewOutcome::Rejected,
            (_, other) => ReviewOutcome::Unexpected(other),
        }
    }
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewDecision::Approve => write!(f, "approve"),
            ReviewDecision::Reject => write!(f, "reject"),
        }
    }
}

impl ReviewOutcome {
    pub fn is_unexpected(&self) -> bool {
        matches!(self, ReviewOutcome::Unexpected(_))
    }
}

/// A proposal as returned by the server.
///
/// Fields the server left out stay `None` rather than taking a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ProposalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProposalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_edge_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_after: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Proposal {
    /// First eight characters of the id, for compact listings.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    pub fn created_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        parse_timestamp(self.created_at.as_deref()?)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|status| status.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transition_table() {
        use ProposalStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Applied));
        assert!(Approved.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Applied));
        assert!(!Applied.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Rejected));
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<ProposalStatus> = ProposalStatus::ALL
            .into_iter()
            .filter(ProposalStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![ProposalStatus::Rejected, ProposalStatus::Applied, ProposalStatus::Failed]
        );
    }

    #[test]
    fn test_review_outcomes() {
        assert_eq!(
            ReviewDecision::Approve.outcome(ProposalStatus::Applied),
            ReviewOutcome::Applied
        );
        assert_eq!(
            ReviewDecision::Approve.outcome(ProposalStatus::Failed),
            ReviewOutcome::ApplyFailed
        );
        assert_eq!(
            ReviewDecision::Reject.outcome(ProposalStatus::Rejected),
            ReviewOutcome::Rejected
        );
        assert!(ReviewDecision::Approve.outcome(ProposalStatus::Pending).is_unexpected());
        assert!(ReviewDecision::Reject.outcome(ProposalStatus::Applied).is_unexpected());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("PENDING".parse::<ProposalStatus>().unwrap(), ProposalStatus::Pending);
        assert!("merged".parse::<ProposalStatus>().is_err());
        assert!("unknown".parse::<ProposalStatus>().is_err());
    }

    #[test]
    fn test_unrecognised_wire_values_decode_as_unknown() {
        let proposal: Proposal = serde_json::from_value(json!({
            "id": "p7", "type": "merge-nodes", "status": "archived"
        }))
        .unwrap();
        assert_eq!(proposal.kind, ProposalKind::Unknown);
        assert_eq!(proposal.status, Some(ProposalStatus::Unknown));
        assert!(!proposal.is_terminal());
        assert!(ProposalStatus::Unknown.successors().is_empty());
        assert!(!ProposalKind::Unknown.carries_data());
    }

    #[test]
    fn test_kind_wire_names() {
        for kind in ProposalKind::ALL {
            let wire = serde_json::to_value(kind).unwrap();
            assert_eq!(wire, json!(kind.as_str()));
        }
        assert_eq!(ProposalKind::EditEdge.target_field(), Some("targetEdgeId"));
        assert!(ProposalKind::AddNode.target_field().is_none());
        assert!(!ProposalKind::DeleteNode.carries_data());
    }

    #[test]
    fn test_proposal_from_wire() {
        let proposal: Proposal = serde_json::from_value(json!({
            "id": "7f3c2a9e-1b4d-4c8a-9e2f-0a1b2c3d4e5f",
            "type": "edit-node",
            "status": "applied",
            "targetNodeId": "jeffrey_epstein",
            "dataAfter": {"notes": "updated"},
            "reason": "source added",
            "authorName": "alice",
            "reviewComment": "",
            "createdAt": "2025-02-01T10:00:00.000Z",
            "applyResult": {"ok": true}
        }))
        .unwrap();
        assert_eq!(proposal.kind, ProposalKind::EditNode);
        assert!(proposal.is_terminal());
        assert_eq!(proposal.short_id(), "7f3c2a9e");
        assert_eq!(proposal.extra["applyResult"]["ok"], true);
        assert!(proposal.created_at_utc().is_some());
    }

    #[test]
    fn test_short_id_of_short_id() {
        let proposal: Proposal =
            serde_json::from_value(json!({"id": "p1", "type": "add-node"})).unwrap();
        assert_eq!(proposal.short_id(), "p1");
    }

    #[test]
    fn test_missing_fields_are_not_invented() {
        let wire = json!({"id": "p1", "type": "delete-node", "targetNodeId": "n1"});
        let proposal: Proposal = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(proposal.status, None);
        assert_eq!(proposal.reason, None);
        assert!(!proposal.is_terminal());
        assert_eq!(serde_json::to_value(&proposal).unwrap(), wire);
    }
}
