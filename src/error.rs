//! Error types for the MCP tool server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// JSON-RPC error codes used by the dispatcher
pub mod codes {
    /// Unparsable JSON or malformed envelope
    pub const INVALID_REQUEST: i32 = -32600;

    /// Unknown method
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Missing tool name, unknown tool, bad arguments or tool failure
    pub const INVALID_PARAMS: i32 = -32602;

    /// Server failed to encode its own response
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Main error type for the MCP tool server
#[derive(Error, Debug)]
pub enum McpServerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// Tool invocation errors
    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    /// Argument validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Reserved metadata key errors
    #[error("Metadata error: {0}")]
    Metadata(#[from] ReservedMetadataError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// MCP protocol errors.
///
/// The `Display` output is the exact message sent on the wire, so keep it
/// free of internal details.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum McpError {
    #[error("Invalid Request")]
    InvalidRequest,

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid params: missing tool name")]
    MissingToolName,

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Invalid params: {0}")]
    InvalidArguments(ValidationError),

    #[error("Tool execution failed: {name}: {message}")]
    ToolFailed { name: String, message: String },

    #[error("Internal error")]
    Internal,
}

impl McpError {
    /// JSON-RPC error code for this error
    pub fn code(&self) -> i32 {
        match self {
            McpError::InvalidRequest => codes::INVALID_REQUEST,
            McpError::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            McpError::MissingToolName
            | McpError::ToolNotFound { .. }
            | McpError::InvalidArguments(_)
            | McpError::ToolFailed { .. } => codes::INVALID_PARAMS,
            McpError::Internal => codes::INTERNAL_ERROR,
        }
    }
}

/// Failures raised by [`ToolRegistry::invoke`](crate::mcp::tools::ToolRegistry::invoke)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] ValidationError),

    #[error("Tool {name} failed: {message}")]
    Handler { name: String, message: String },
}

impl From<InvocationError> for McpError {
    fn from(err: InvocationError) -> Self {
        match err {
            InvocationError::ToolNotFound { name } => McpError::ToolNotFound { name },
            InvocationError::InvalidArguments(e) => McpError::InvalidArguments(e),
            InvocationError::Handler { name, message } => McpError::ToolFailed { name, message },
        }
    }
}

/// Argument schema validation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} {reason}")]
pub struct ValidationError {
    /// Dotted path of the offending field
    pub field: String,

    /// Human-readable reason
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A metadata map contained a key with a reserved prefix
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Reserved metadata key: {key}")]
pub struct ReservedMetadataError {
    pub key: String,
}

/// Result type alias for MCP server operations
pub type Result<T> = std::result::Result<T, McpServerError>;
