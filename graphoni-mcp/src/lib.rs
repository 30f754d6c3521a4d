//! # Graphoni MCP
//!
//! Model Context Protocol server exposing the Graphoni client as tools.
//!
//! Every tool maps to exactly one client operation, so the tool surface and
//! the command line never drift apart. Messages are JSON-RPC 2.0, one per
//! line over stdio.
//!
//! ```text
//! Host <-> Transport (stdio/channel) <-> McpServer <-> RequestHandler
//!                                                        +-- ToolRegistry -> GraphoniClient
//! ```

pub mod error;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod tools;
pub mod transport;

use graphoni_core::{DefaultsConfig, GraphoniClient};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub use error::{McpError, ToolError};
use handlers::RequestHandler;
use protocol::{IncomingMessage, JsonRpcResponse, RequestId};
pub use registry::{Access, Tool, ToolOutput, ToolRegistry};
pub use tools::{ToolContext, register_graphoni_tools};
pub use transport::{ChannelTransport, LineTransport, StdioTransport, Transport};

/// Processes JSON-RPC messages from a transport until it closes.
pub struct McpServer {
    handler: RequestHandler,
}

impl McpServer {
    pub fn new(tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            handler: RequestHandler::new(tool_registry),
        }
    }

    /// A server offering every Graphoni tool over `client`.
    pub fn for_client(client: GraphoniClient, defaults: DefaultsConfig) -> Result<Self, McpError> {
        let mut registry = ToolRegistry::new();
        register_graphoni_tools(&mut registry, ToolContext::new(client, defaults)).map_err(
            |e| McpError::InternalError {
                message: e.to_string(),
            },
        )?;
        Ok(Self::new(Arc::new(registry)))
    }

    /// Serve until EOF. A read error ends the session; malformed frames and
    /// messages get an error response with a null id and do not.
    pub async fn run<T: Transport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        info!("MCP server starting");

        loop {
            let response = match transport.read_message().await {
                Ok(Some(message)) if message.trim().is_empty() => continue,
                Ok(Some(message)) => {
                    debug!(message = %message, "Received MCP message");
                    match self.process_message(&message).await {
                        Ok(Some(response)) => response,
                        Ok(None) => continue,
                        Err(e) => {
                            warn!(error = %e, "Rejected MCP message");
                            JsonRpcResponse::from_mcp_error(RequestId::Null, e)
                        }
                    }
                }
                Ok(None) => {
                    info!("Transport closed (EOF), shutting down MCP server");
                    break;
                }
                Err(e) if e.is_recoverable_frame() => {
                    warn!(error = %e, "Skipped malformed frame");
                    JsonRpcResponse::from_mcp_error(RequestId::Null, e)
                }
                Err(e) => {
                    error!(error = %e, "Transport read error");
                    break;
                }
            };

            let response_json =
                serde_json::to_string(&response).map_err(|e| McpError::InternalError {
                    message: format!("Failed to serialize response: {e}"),
                })?;
            debug!(response = %response_json, "Sending MCP response");
            transport.write_message(&response_json).await?;
        }

        transport.close().await?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Handle one raw message. Notifications yield `None`.
    async fn process_message(&mut self, raw: &str) -> Result<Option<JsonRpcResponse>, McpError> {
        let incoming: IncomingMessage =
            serde_json::from_str(raw).map_err(|e| McpError::ParseError {
                message: format!("Invalid JSON-RPC message: {e}"),
            })?;

        if incoming.jsonrpc != "2.0" {
            return Err(McpError::InvalidRequest {
                message: format!("Expected jsonrpc version 2.0, got: {}", incoming.jsonrpc),
            });
        }

        match incoming.id {
            None => {
                debug!(method = %incoming.method, "Processing notification");
                if let Err(e) = self.handler.route(&incoming.method, incoming.params).await {
                    warn!(method = %incoming.method, error = %e, "Notification handler error");
                }
                Ok(None)
            }
            Some(id) => {
                debug!(method = %incoming.method, "Processing request");
                let response = match self.handler.route(&incoming.method, incoming.params).await {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(e) => JsonRpcResponse::from_mcp_error(id, e),
                };
                Ok(Some(response))
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.handler.is_initialized()
    }
}
