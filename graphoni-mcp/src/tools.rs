//! The Graphoni tools: one per client operation.
//!
//! Every tool decodes its arguments, makes exactly one client call and
//! returns the result as pretty JSON. Graphoni errors come back as error
//! results (`HTTP <code>: <detail>`), not as protocol errors.

use async_trait::async_trait;
use graphoni_core::{
    AuditQuery, DefaultsConfig, GraphoniClient, ProposalFilter, ProposalRequest, ProposalStatus,
    Query, QueryKind, QueryParts,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::error::ToolError;
use crate::registry::{Access, Tool, ToolOutput, ToolRegistry, parse_args};

/// What every tool shares: the client and the configured default arguments.
pub struct ToolContext {
    pub client: GraphoniClient,
    pub defaults: DefaultsConfig,
}

impl ToolContext {
    pub fn new(client: GraphoniClient, defaults: DefaultsConfig) -> Arc<Self> {
        Arc::new(Self { client, defaults })
    }
}

/// Define a Graphoni tool.
///
/// ```text
/// graphoni_tool!(Name, "wire_name", Access, "description", ArgsType, schema_expr,
///     |ctx, args| { body returning graphoni_core::Result<impl Serialize> })
/// ```
macro_rules! graphoni_tool {
    (
        $name:ident,
        $tool_name:literal,
        $access:ident,
        $desc:expr,
        $args_ty:ty,
        $schema:expr,
        |$ctx:ident, $args:ident| $body:block
    ) => {
        pub struct $name {
            ctx: Arc<ToolContext>,
        }

        impl $name {
            pub fn new(ctx: Arc<ToolContext>) -> Self {
                Self { ctx }
            }

            async fn run(&self, $args: $args_ty) -> graphoni_core::Result<impl serde::Serialize> {
                let $ctx: &ToolContext = &self.ctx;
                $body
            }
        }

        #[async_trait]
        impl Tool for $name {
            fn name(&self) -> &str {
                $tool_name
            }

            fn description(&self) -> &str {
                $desc
            }

            fn parameters_schema(&self) -> Value {
                $schema
            }

            fn access(&self) -> Access {
                Access::$access
            }

            async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
                let args: $args_ty = parse_args($tool_name, args)?;
                Ok(ToolOutput::from_result(self.run(args).await))
            }
        }
    };
}

#[derive(Debug, Deserialize)]
pub struct NoArgs {}

#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    query: String,
    limit: Option<i64>,
    types: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NeighborhoodArgs {
    node_id: String,
    hops: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FindPathArgs {
    from_node: String,
    to_node: String,
    max_length: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QueryArgs {
    #[serde(rename = "type")]
    kind: String,
    limit: Option<i64>,
    #[serde(flatten)]
    parts: QueryParts,
}

#[derive(Debug, Deserialize)]
pub struct AddNodeArgs {
    label: String,
    node_type: String,
    reason: String,
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct EditNodeArgs {
    node_id: String,
    reason: String,
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteNodeArgs {
    node_id: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
pub struct AddEdgeArgs {
    source: String,
    target: String,
    edge_type: String,
    reason: String,
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct EditEdgeArgs {
    edge_id: String,
    reason: String,
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteEdgeArgs {
    edge_id: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ListProposalsArgs {
    status: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ProposalIdArgs {
    proposal_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewArgs {
    proposal_id: String,
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuditLogArgs {
    limit: Option<i64>,
    offset: Option<i64>,
    target_node_id: Option<String>,
    action: Option<String>,
    user_id: Option<String>,
}

fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn integer_prop(description: &str) -> Value {
    json!({ "type": "integer", "description": description })
}

fn object_prop(description: &str) -> Value {
    json!({ "type": "object", "description": description })
}

// --- Reads (guest) ---

graphoni_tool!(
    SearchTool,
    "search",
    Guest,
    "Text search for nodes by label, ID, name, or notes. Returns matching nodes with their properties.",
    SearchArgs,
    json!({
        "type": "object",
        "properties": {
            "query": string_prop("Search text (substring match)"),
            "limit": integer_prop("Maximum results to return (default: 20)"),
            "types": string_prop("Comma-separated node types to filter, e.g. \"Person,Organization\"")
        },
        "required": ["query"]
    }),
    |ctx, args| {
        let types: Vec<String> = args
            .types
            .as_deref()
            .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        let limit = args.limit.unwrap_or(ctx.defaults.search_limit);
        ctx.client.search(&args.query, limit, &types).await
    }
);

graphoni_tool!(
    GetNodeTool,
    "get_node",
    Guest,
    "Get a node and its neighborhood (connected nodes and edges) as graph elements.",
    NeighborhoodArgs,
    json!({
        "type": "object",
        "properties": {
            "node_id": string_prop("The node ID to look up"),
            "hops": integer_prop("How many hops to expand (default: 1). 0 returns the node alone"),
            "limit": integer_prop("Maximum elements to return (default: 100)")
        },
        "required": ["node_id"]
    }),
    |ctx, args| {
        let hops = args.hops.unwrap_or(ctx.defaults.node_hops);
        let limit = args.limit.unwrap_or(ctx.defaults.node_limit);
        ctx.client.get_node(&args.node_id, hops, limit).await
    }
);

graphoni_tool!(
    ExpandTool,
    "expand",
    Guest,
    "Expand the neighborhood around a node, returning the newly reachable elements.",
    NeighborhoodArgs,
    json!({
        "type": "object",
        "properties": {
            "node_id": string_prop("The node ID to expand from"),
            "hops": integer_prop("How many hops to expand (default: 1)"),
            "limit": integer_prop("Maximum elements to return (default: 100)")
        },
        "required": ["node_id"]
    }),
    |ctx, args| {
        let hops = args.hops.unwrap_or(ctx.defaults.node_hops);
        let limit = args.limit.unwrap_or(ctx.defaults.node_limit);
        ctx.client.expand(&args.node_id, hops, limit).await
    }
);

graphoni_tool!(
    FindPathTool,
    "find_path",
    Guest,
    "Find the shortest path between two nodes. Returns path elements, pathLength and counts, or a message when no path exists.",
    FindPathArgs,
    json!({
        "type": "object",
        "properties": {
            "from_node": string_prop("Source node ID"),
            "to_node": string_prop("Target node ID"),
            "max_length": integer_prop("Maximum path length in hops (default: 6)")
        },
        "required": ["from_node", "to_node"]
    }),
    |ctx, args| {
        let max_length = args.max_length.unwrap_or(ctx.defaults.path_max_length);
        ctx.client
            .find_path(&args.from_node, &args.to_node, max_length)
            .await
    }
);

graphoni_tool!(
    StatsTool,
    "stats",
    Guest,
    "Graph statistics: total node and edge counts and counts by type.",
    NoArgs,
    json!({ "type": "object", "properties": {} }),
    |ctx, _args| { ctx.client.stats().await }
);

graphoni_tool!(
    MeTool,
    "me",
    Guest,
    "Show the account behind the configured API key.",
    NoArgs,
    json!({ "type": "object", "properties": {} }),
    |ctx, _args| { ctx.client.me().await }
);

// --- Complex query (moderator) ---

graphoni_tool!(
    QueryTool,
    "query",
    Moderator,
    "Execute a complex graph query. type=\"structured\" uses node_types, filters, center_node, hops; \
     type=\"cypher\" runs the cypher string verbatim; type=\"search\" uses q; \
     type=\"community\" uses community_id and optional level. Fields of other types are rejected.",
    QueryArgs,
    json!({
        "type": "object",
        "properties": {
            "type": {
                "type": "string",
                "enum": ["structured", "cypher", "search", "community"],
                "description": "Query type"
            },
            "node_types": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Node types to filter (structured)"
            },
            "filters": object_prop("Property filters (structured)"),
            "center_node": string_prop("Center node ID for neighborhood queries (structured)"),
            "hops": integer_prop("Hops from the center node (structured)"),
            "cypher": string_prop("Cypher query string (cypher)"),
            "q": string_prop("Search text (search)"),
            "community_id": string_prop("Community ID (community)"),
            "level": integer_prop("Community level (community)"),
            "limit": integer_prop("Maximum results (default: 5000)")
        },
        "required": ["type"]
    }),
    |ctx, args| {
        let kind: QueryKind = args.kind.parse()?;
        let query = Query::from_parts(kind, args.parts)?;
        let limit = args.limit.unwrap_or(ctx.defaults.query_limit);
        ctx.client.query(&query, limit).await
    }
);

// --- Proposals (contributor) ---

graphoni_tool!(
    AddNodeTool,
    "add_node",
    Contributor,
    "Submit a proposal to add a new node to the graph. The proposal waits for moderator review.",
    AddNodeArgs,
    json!({
        "type": "object",
        "properties": {
            "label": string_prop("Display label for the node"),
            "node_type": string_prop("Type of node, e.g. \"Person\", \"Organization\", \"Location\""),
            "reason": string_prop("Reason for adding this node"),
            "properties": object_prop("Optional additional properties")
        },
        "required": ["label", "node_type", "reason"]
    }),
    |ctx, args| {
        let request = ProposalRequest::add_node(args.label, args.node_type)
            .with_properties(args.properties.unwrap_or_default());
        ctx.client.propose(&request, &args.reason).await
    }
);

graphoni_tool!(
    EditNodeTool,
    "edit_node",
    Contributor,
    "Submit a proposal to edit an existing node. Properties are merged with the existing ones.",
    EditNodeArgs,
    json!({
        "type": "object",
        "properties": {
            "node_id": string_prop("ID of the node to edit"),
            "reason": string_prop("Reason for the edit"),
            "properties": object_prop("Properties to update")
        },
        "required": ["node_id", "reason", "properties"]
    }),
    |ctx, args| {
        let request = ProposalRequest::edit_node(args.node_id, args.properties);
        ctx.client.propose(&request, &args.reason).await
    }
);

graphoni_tool!(
    DeleteNodeTool,
    "delete_node",
    Contributor,
    "Submit a proposal to delete a node.",
    DeleteNodeArgs,
    json!({
        "type": "object",
        "properties": {
            "node_id": string_prop("ID of the node to delete"),
            "reason": string_prop("Reason for deletion")
        },
        "required": ["node_id", "reason"]
    }),
    |ctx, args| {
        let request = ProposalRequest::delete_node(args.node_id);
        ctx.client.propose(&request, &args.reason).await
    }
);

graphoni_tool!(
    AddEdgeTool,
    "add_edge",
    Contributor,
    "Submit a proposal to add a new edge between two nodes.",
    AddEdgeArgs,
    json!({
        "type": "object",
        "properties": {
            "source": string_prop("Source node ID"),
            "target": string_prop("Target node ID"),
            "edge_type": string_prop("Type of edge, e.g. \"KNOWS\", \"EMPLOYED_BY\""),
            "reason": string_prop("Reason for adding this edge"),
            "properties": object_prop("Optional additional properties")
        },
        "required": ["source", "target", "edge_type", "reason"]
    }),
    |ctx, args| {
        let request = ProposalRequest::add_edge(args.source, args.target, args.edge_type)
            .with_properties(args.properties.unwrap_or_default());
        ctx.client.propose(&request, &args.reason).await
    }
);

graphoni_tool!(
    EditEdgeTool,
    "edit_edge",
    Contributor,
    "Submit a proposal to edit an existing edge.",
    EditEdgeArgs,
    json!({
        "type": "object",
        "properties": {
            "edge_id": string_prop("ID of the edge to edit"),
            "reason": string_prop("Reason for the edit"),
            "properties": object_prop("Properties to update")
        },
        "required": ["edge_id", "reason", "properties"]
    }),
    |ctx, args| {
        let request = ProposalRequest::edit_edge(args.edge_id, args.properties);
        ctx.client.propose(&request, &args.reason).await
    }
);

graphoni_tool!(
    DeleteEdgeTool,
    "delete_edge",
    Contributor,
    "Submit a proposal to delete an edge.",
    DeleteEdgeArgs,
    json!({
        "type": "object",
        "properties": {
            "edge_id": string_prop("ID of the edge to delete"),
            "reason": string_prop("Reason for deletion")
        },
        "required": ["edge_id", "reason"]
    }),
    |ctx, args| {
        let request = ProposalRequest::delete_edge(args.edge_id);
        ctx.client.propose(&request, &args.reason).await
    }
);

// --- Review (moderator) ---

graphoni_tool!(
    ListProposalsTool,
    "list_proposals",
    Moderator,
    "List edit proposals, most recent first, optionally filtered by status.",
    ListProposalsArgs,
    json!({
        "type": "object",
        "properties": {
            "status": {
                "type": "string",
                "enum": ["pending", "approved", "rejected", "applied", "failed"],
                "description": "Filter by status"
            },
            "limit": integer_prop("Maximum results (default: 50)"),
            "offset": integer_prop("Results to skip (default: 0)")
        }
    }),
    |ctx, args| {
        let filter = ProposalFilter {
            status: args
                .status
                .as_deref()
                .map(str::parse::<ProposalStatus>)
                .transpose()?,
            limit: args.limit.unwrap_or(ctx.defaults.list_limit),
            offset: args.offset.unwrap_or(0),
        };
        ctx.client.list_proposals(&filter).await
    }
);

graphoni_tool!(
    GetProposalTool,
    "get_proposal",
    Moderator,
    "Fetch a single proposal by id.",
    ProposalIdArgs,
    json!({
        "type": "object",
        "properties": {
            "proposal_id": string_prop("ID of the proposal")
        },
        "required": ["proposal_id"]
    }),
    |ctx, args| { ctx.client.get_proposal(&args.proposal_id).await }
);

graphoni_tool!(
    ApproveProposalTool,
    "approve_proposal",
    Moderator,
    "Approve a pending proposal. The change is then applied to the graph; the returned status \
     (approved, applied or failed) is what actually happened.",
    ReviewArgs,
    json!({
        "type": "object",
        "properties": {
            "proposal_id": string_prop("ID of the proposal to approve"),
            "comment": string_prop("Optional review comment")
        },
        "required": ["proposal_id"]
    }),
    |ctx, args| {
        ctx.client
            .approve(&args.proposal_id, args.comment.as_deref())
            .await
    }
);

graphoni_tool!(
    RejectProposalTool,
    "reject_proposal",
    Moderator,
    "Reject a pending proposal.",
    ReviewArgs,
    json!({
        "type": "object",
        "properties": {
            "proposal_id": string_prop("ID of the proposal to reject"),
            "comment": string_prop("Optional review comment")
        },
        "required": ["proposal_id"]
    }),
    |ctx, args| {
        ctx.client
            .reject(&args.proposal_id, args.comment.as_deref())
            .await
    }
);

graphoni_tool!(
    AuditLogTool,
    "audit_log",
    Moderator,
    "Read the audit log of past actions, optionally filtered by node, action or user.",
    AuditLogArgs,
    json!({
        "type": "object",
        "properties": {
            "limit": integer_prop("Maximum entries (default: 50)"),
            "offset": integer_prop("Entries to skip (default: 0)"),
            "target_node_id": string_prop("Only entries about this node"),
            "action": string_prop("Only entries with this action"),
            "user_id": string_prop("Only entries by this user")
        }
    }),
    |ctx, args| {
        let query = AuditQuery {
            limit: args.limit.unwrap_or(ctx.defaults.list_limit),
            offset: args.offset.unwrap_or(0),
            target_node_id: args.target_node_id,
            action: args.action,
            user_id: args.user_id,
        };
        ctx.client.audit_log(&query).await
    }
);

/// Register every Graphoni tool.
pub fn register_graphoni_tools(
    registry: &mut ToolRegistry,
    ctx: Arc<ToolContext>,
) -> Result<(), ToolError> {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(SearchTool::new(ctx.clone())),
        Arc::new(GetNodeTool::new(ctx.clone())),
        Arc::new(ExpandTool::new(ctx.clone())),
        Arc::new(FindPathTool::new(ctx.clone())),
        Arc::new(StatsTool::new(ctx.clone())),
        Arc::new(MeTool::new(ctx.clone())),
        Arc::new(QueryTool::new(ctx.clone())),
        Arc::new(AddNodeTool::new(ctx.clone())),
        Arc::new(EditNodeTool::new(ctx.clone())),
        Arc::new(DeleteNodeTool::new(ctx.clone())),
        Arc::new(AddEdgeTool::new(ctx.clone())),
        Arc::new(EditEdgeTool::new(ctx.clone())),
        Arc::new(DeleteEdgeTool::new(ctx.clone())),
        Arc::new(ListProposalsTool::new(ctx.clone())),
        Arc::new(GetProposalTool::new(ctx.clone())),
        Arc::new(ApproveProposalTool::new(ctx.clone())),
        Arc::new(RejectProposalTool::new(ctx.clone())),
        Arc::new(AuditLogTool::new(ctx)),
    ];
    for tool in tools {
        registry.register(tool)?;
    }
    Ok(())
}
