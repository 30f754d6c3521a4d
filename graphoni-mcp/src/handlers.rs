//! Routes JSON-RPC methods to the tool registry.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{McpError, ToolError};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, ListToolsResult,
    MCP_PROTOCOL_VERSION, ServerCapabilities, ServerInfo, ToolsCapability,
};
use crate::registry::ToolRegistry;

/// Tracks the session state and answers the methods a tools-only server supports.
pub struct RequestHandler {
    tool_registry: Arc<ToolRegistry>,
    initialized: bool,
    server_info: ServerInfo,
}

impl RequestHandler {
    pub fn new(tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            tool_registry,
            initialized: false,
            server_info: ServerInfo {
                name: "graphoni".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn handle_initialize(&mut self, params: InitializeParams) -> Result<Value, McpError> {
        info!(
            client = %params.client_info.name,
            client_version = ?params.client_info.version,
            protocol_version = %params.protocol_version,
            "MCP client connecting"
        );

        self.initialized = true;

        to_result(
            &InitializeResult {
                protocol_version: MCP_PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability {
                        list_changed: Some(false),
                    }),
                },
                server_info: self.server_info.clone(),
            },
            "initialize result",
        )
    }

    pub fn handle_tools_list(&self) -> Result<Value, McpError> {
        if !self.initialized {
            return Err(McpError::NotInitialized);
        }

        let tools = self.tool_registry.list_definitions();
        debug!(count = tools.len(), "Listing tools");
        to_result(&ListToolsResult { tools }, "tools list")
    }

    /// Run one tool.
    ///
    /// An unknown tool is a protocol error. Anything that goes wrong inside a
    /// known tool comes back as a result flagged `isError`.
    pub async fn handle_tools_call(&self, params: CallToolParams) -> Result<Value, McpError> {
        if !self.initialized {
            return Err(McpError::NotInitialized);
        }

        let tool_name = &params.name;
        let arguments = params
            .arguments
            .unwrap_or(Value::Object(Default::default()));

        info!(tool = %tool_name, "Calling tool via MCP");
        debug!(tool = %tool_name, args = %arguments, "Tool call arguments");

        let result = match self.tool_registry.execute(tool_name, arguments).await {
            Ok(output) => {
                if output.is_error {
                    warn!(tool = %tool_name, error = %output.content, "Graphoni call failed");
                }
                CallToolResult::text(output.content, output.is_error)
            }
            Err(ToolError::NotFound { name }) => return Err(McpError::UnknownTool { name }),
            Err(e) => {
                warn!(tool = %tool_name, error = %e, "Tool execution failed");
                CallToolResult::text(format!("Error: {e}"), true)
            }
        };

        to_result(&result, "tool result")
    }

    pub async fn route(&mut self, method: &str, params: Value) -> Result<Value, McpError> {
        match method {
            "initialize" => {
                let init_params: InitializeParams =
                    serde_json::from_value(params).map_err(|e| McpError::InvalidParams {
                        message: format!("Invalid initialize params: {e}"),
                    })?;
                self.handle_initialize(init_params)
            }
            "notifications/initialized" => {
                info!("MCP client initialized successfully");
                Ok(Value::Null)
            }
            "ping" => Ok(Value::Object(Default::default())),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => {
                let call_params: CallToolParams =
                    serde_json::from_value(params).map_err(|e| McpError::InvalidParams {
                        message: format!("Invalid tools/call params: {e}"),
                    })?;
                self.handle_tools_call(call_params).await
            }
            _ => Err(McpError::MethodNotFound {
                method: method.to_string(),
            }),
        }
    }
}

fn to_result<T: Serialize>(value: &T, what: &str) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError {
        message: format!("Failed to serialize {what}: {e}"),
    })
}
