//! Tool registry: the tools the server advertises and how calls reach them.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ToolError;
use crate::protocol::McpTool;

/// The server role a tool call normally needs.
///
/// Display only: the Graphoni server decides what each credential may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Guest,
    Contributor,
    Moderator,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Guest => write!(f, "guest"),
            Access::Contributor => write!(f, "contributor"),
            Access::Moderator => write!(f, "moderator"),
        }
    }
}

/// What a tool call produced: text for the caller, flagged when it is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }

    /// Pretty-printed JSON of any serializable result.
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::text(text),
            Err(e) => Self::error(format!("Failed to serialize result: {e}")),
        }
    }

    /// JSON on success; the error's display text, flagged, on failure.
    pub fn from_result<T: Serialize>(result: graphoni_core::Result<T>) -> Self {
        match result {
            Ok(value) => Self::json(&value),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters_schema(&self) -> Value;

    fn access(&self) -> Access;

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError>;
}

/// Decode a tool's arguments object into its typed form.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        name: tool.to_string(),
        reason: e.to_string(),
    })
}

/// All registered tools, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered { name });
        }
        debug!(tool = %name, access = %tool.access(), "Registering tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool definitions in name order, as sent by `tools/list`.
    ///
    /// Tools above guest level say so at the end of their description.
    pub fn list_definitions(&self) -> Vec<McpTool> {
        self.tools
            .values()
            .map(|tool| {
                let description = match tool.access() {
                    Access::Guest => tool.description().to_string(),
                    access => format!("{} Requires {access} access.", tool.description()),
                };
                McpTool {
                    name: tool.name().to_string(),
                    description: Some(description),
                    input_schema: tool.parameters_schema(),
                }
            })
            .collect()
    }

    pub fn list_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
        })?;
        info!(tool = %name, access = %tool.access(), "Executing tool");
        tool.execute(args).await
    }
}
