//! MCP protocol type definitions
//!
//! Types for the Model Context Protocol used for tool invocation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC version
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version announced when the client asks for nothing we know
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol versions this server can speak (newest first)
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Request ID, echoed back verbatim.
///
/// JSON-RPC allows strings and numbers; anything else a peer sends is kept
/// as-is rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct RequestId(pub Value);

impl RequestId {
    /// The `null` id used when the request id cannot be determined
    pub fn null() -> Self {
        Self(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self(Value::from(id))
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(Value::from(id))
    }
}

impl From<Value> for RequestId {
    fn from(id: Value) -> Self {
        Self(id)
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: String,

    /// Request ID
    pub id: RequestId,

    /// Result (on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error (on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,

    /// Error message
    pub message: String,

    /// Additional data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// MCP server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,

    /// Server version
    pub version: String,
}

/// Initialize request params; only the fields the server looks at
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by the client
    #[serde(default)]
    pub protocol_version: Option<String>,

    /// Client info
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Client info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name
    pub name: String,

    /// Client version
    #[serde(default)]
    pub version: Option<String>,
}

/// Initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version
    pub protocol_version: String,

    /// Server capabilities, passed through unchanged
    pub capabilities: Value,

    /// Server info
    pub server_info: ServerInfo,
}

/// Tool definition as listed on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Input schema (JSON Schema)
    pub input_schema: Value,

    /// Presentation hints with camelCase keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Map<String, Value>>,
}

/// List tools result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Available tools
    pub tools: Vec<Tool>,
}

/// Call tool params.
///
/// `name` stays optional so a missing name can be reported as such instead of
/// as a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CallToolParams {
    /// Tool name
    #[serde(default)]
    pub name: Option<String>,

    /// Tool arguments
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Tool result content item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ToolResultContent {
    /// Text content
    #[serde(rename = "text")]
    Text { text: String },
}

/// Call tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Result content
    pub content: Vec<ToolResultContent>,

    /// Whether the tool call resulted in an error
    pub is_error: bool,

    /// Machine-readable copy of structured tool output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl CallToolResult {
    /// Create a text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent::Text { text: text.into() }],
            is_error: false,
            structured_content: None,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent::Text {
                text: format!("Error: {}", message.into()),
            }],
            is_error: true,
            structured_content: None,
        }
    }
}

/// Methods the dispatcher knows how to route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Ping,
    Initialize,
    Initialized,
    ListTools,
    CallTool,
}

impl Method {
    /// Every routable method, in dispatch-table order
    pub const ALL: [Method; 5] = [
        Method::Ping,
        Method::Initialize,
        Method::Initialized,
        Method::ListTools,
        Method::CallTool,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Ping => "ping",
            Method::Initialize => "initialize",
            Method::Initialized => "notifications/initialized",
            Method::ListTools => "tools/list",
            Method::CallTool => "tools/call",
        }
    }

    /// Exact, case-sensitive lookup
    pub fn parse(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == method)
    }
}
