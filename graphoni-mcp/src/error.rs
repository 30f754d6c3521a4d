//! Error types for the tool server.

/// Protocol-level failures. Each maps to a JSON-RPC error code.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("JSON-RPC parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Message exceeds the {limit}-byte frame limit")]
    FrameTooLarge { limit: usize },

    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("Peer closed the connection")]
    PeerClosed,

    #[error("Server not initialized")]
    NotInitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// A malformed frame was skipped; the session can go on.
    pub fn is_recoverable_frame(&self) -> bool {
        matches!(self, McpError::FrameTooLarge { .. } | McpError::InvalidFrame { .. })
    }

    /// JSON-RPC error code for this error.
    pub fn error_code(&self) -> i64 {
        match self {
            McpError::ParseError { .. } | McpError::Json(_) => -32700,
            McpError::InvalidRequest { .. }
            | McpError::FrameTooLarge { .. }
            | McpError::InvalidFrame { .. } => -32600,
            McpError::MethodNotFound { .. } => -32601,
            McpError::InvalidParams { .. } | McpError::UnknownTool { .. } => -32602,
            McpError::InternalError { .. } | McpError::Io(_) => -32603,
            McpError::PeerClosed => -32002,
            McpError::NotInitialized => -32003,
        }
    }
}

/// Failures of the tool layer itself, before a Graphoni call is made.
///
/// Errors returned by the Graphoni server are not `ToolError`s: they become
/// error results of the tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    #[error("Tool already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Invalid arguments for tool '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },
}
