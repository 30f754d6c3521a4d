//! # Graphoni Core
//!
//! Typed client for the Graphoni graph-wiki REST API.
//! Provides the request/error contract, the query dispatcher, the moderated
//! proposal workflow, result shaping, configuration and the data model.
//!
//! The client owns no graph data: every operation is one request to the
//! server and every result is a transient copy.

pub mod client;
pub mod config;
pub mod error;
pub mod proposal;
pub mod query;
pub mod shape;
pub mod transport;
pub mod types;
pub mod workflow;

// Re-export commonly used types at the crate root.
pub use client::{AuditQuery, GraphoniClient};
pub use config::{DefaultsConfig, GraphoniConfig, ServerConfig, load_config};
pub use error::{GraphoniError, Result, TransportFailure};
pub use proposal::{Proposal, ProposalKind, ProposalStatus, ReviewDecision, ReviewOutcome};
pub use query::{Query, QueryKind, QueryParts};
pub use shape::{GraphResult, GraphSummary, GroupCount, PathResult, Record, Reply, ResultCount, Shaped};
pub use transport::{ApiRequest, HttpTransport, Method, MockTransport, Transport};
pub use types::{AuditEntry, Edge, ElementGroup, GraphElement, GraphStats, Node, UserInfo};
pub use workflow::{ProposalFilter, ProposalPayload, ProposalRequest};
