//! `GraphoniClient`: direct graph reads and query dispatch.
//!
//! Every method issues exactly one request through the configured
//! [`Transport`] and reshapes the response into a [`Reply`]. Numeric arguments are passed
//! through unchanged; range checks are the server's business.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::ServerConfig;
use crate::error::{GraphoniError, Result};
use crate::query::Query;
use crate::shape::{GraphResult, PathResult, Record, Reply, decode_list};
use crate::transport::{ApiRequest, HttpTransport, Transport};
use crate::types::{AuditEntry, GraphStats, UserInfo};

/// Filters for the audit log. Unset filters are not sent.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditQuery {
    pub limit: i64,
    pub offset: i64,
    pub target_node_id: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<String>,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            target_node_id: None,
            action: None,
            user_id: None,
        }
    }
}

impl AuditQuery {
    pub fn new(limit: i64) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn target_node(mut self, node_id: impl Into<String>) -> Self {
        self.target_node_id = Some(node_id.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Client for the Graphoni REST API.
#[derive(Clone)]
pub struct GraphoniClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for GraphoniClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphoniClient").finish_non_exhaustive()
    }
}

impl GraphoniClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a client that talks HTTP to the configured server.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        debug!(
            url = transport.base_url(),
            authenticated = transport.has_credential(),
            "Graphoni client ready"
        );
        Ok(Self::new(Arc::new(transport)))
    }

    pub(crate) async fn call(&self, request: ApiRequest) -> Result<Value> {
        self.transport.invoke(request).await
    }

    /// Substring search over node label, id, name and notes.
    ///
    /// An empty `types` slice means no type filter.
    pub async fn search(
        &self,
        text: &str,
        limit: i64,
        types: &[String],
    ) -> Result<Reply<Vec<Record>>> {
        let types: Vec<&str> = types
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        let request = ApiRequest::get("/api/graph/search")
            .param("q", text)
            .param("limit", limit)
            .param_opt("types", (!types.is_empty()).then(|| types.join(",")));

        decode_list(self.call(request).await?, "results")
    }

    /// A node and its neighborhood within `hops`, capped at `limit` elements.
    pub async fn get_node(&self, id: &str, hops: i64, limit: i64) -> Result<Reply<GraphResult>> {
        let path = format!("/api/graph/node/{}", path_segment(id, "node id")?);
        let request = ApiRequest::get(path)
            .param("hops", hops)
            .param("limit", limit);
        Reply::shape(self.call(request).await?, GraphResult::from_value)
    }

    /// Neighborhood expansion through the `expand` endpoint.
    pub async fn expand(&self, node_id: &str, hops: i64, limit: i64) -> Result<Reply<GraphResult>> {
        let request = ApiRequest::get("/api/graph/expand")
            .param("nodeId", node_id)
            .param("hops", hops)
            .param("limit", limit);
        Reply::shape(self.call(request).await?, GraphResult::from_value)
    }

    /// Shortest path by edge count, bounded to `max_length` hops.
    ///
    /// No path within the bound is a normal [`PathResult::NoPath`], not an error.
    pub async fn find_path(
        &self,
        from: &str,
        to: &str,
        max_length: i64,
    ) -> Result<Reply<PathResult>> {
        let request = ApiRequest::get("/api/graph/path")
            .param("from", from)
            .param("to", to)
            .param("maxLength", max_length);
        Reply::shape(self.call(request).await?, PathResult::from_value)
    }

    pub async fn stats(&self) -> Result<Reply<GraphStats>> {
        Reply::decode(self.call(ApiRequest::get("/api/graph/stats")).await?)
    }

    /// Dispatch a complex query with its result-size limit attached.
    pub async fn query(&self, query: &Query, limit: i64) -> Result<Reply<GraphResult>> {
        debug!(kind = %query.kind(), limit, "Dispatching graph query");
        let request = ApiRequest::post("/api/graph/query", query.payload(limit)?);
        Reply::shape(self.call(request).await?, GraphResult::from_value)
    }

    /// The account behind the configured credential.
    pub async fn me(&self) -> Result<Reply<UserInfo>> {
        Reply::decode(self.call(ApiRequest::get("/api/me")).await?)
    }

    /// Audit entries in server order. Blank filters are left out.
    pub async fn audit_log(&self, query: &AuditQuery) -> Result<Reply<Vec<AuditEntry>>> {
        let request = ApiRequest::get("/api/audit")
            .param("limit", query.limit)
            .param("offset", query.offset)
            .param_opt("targetNodeId", query.target_node_id.as_deref())
            .param_opt("action", query.action.as_deref())
            .param_opt("userId", query.user_id.as_deref());
        decode_list(self.call(request).await?, "entries")
    }
}

/// Percent-encode an id for use as a path segment. Blank ids are rejected.
pub(crate) fn path_segment(id: &str, what: &str) -> Result<String> {
    if id.trim().is_empty() {
        return Err(GraphoniError::invalid_request(format!("{what} must not be empty")));
    }
    Ok(urlencoding::encode(id).into_owned())
}
