//! MCP Server implementation
//!
//! [`McpServer::handle_request`] turns one line of JSON-RPC text into at most
//! one call on a [`ResponseSink`]. [`McpServer::run_stdio`] wires that to
//! newline-delimited stdin/stdout.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::{Config, ToolErrorPolicy};
use crate::error::{McpError, Result};
use crate::mcp::metadata::{self, Metadata};
use crate::mcp::tools::{Tool, ToolRegistry};
use crate::mcp::types::*;

/// Output side of the transport.
///
/// For every request the dispatcher calls exactly one of these methods, or
/// neither for notifications and peer responses.
pub trait ResponseSink {
    /// Emit a result. `meta` is `Some` (possibly empty) for `tools/call`.
    fn send_result(&mut self, result: Value, id: RequestId, meta: Option<Metadata>);

    fn send_error(&mut self, code: i32, message: String, id: RequestId);
}

/// Whether handling a message produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Replied,
    NoResponse,
}

/// Sink used for notifications: JSON-RPC never answers them
struct DiscardSink;

impl ResponseSink for DiscardSink {
    fn send_result(&mut self, _result: Value, _id: RequestId, _meta: Option<Metadata>) {}

    fn send_error(&mut self, _code: i32, _message: String, _id: RequestId) {}
}

/// Sink that collects wire responses, adding `_meta` to results only when
/// there is something left after sanitizing
#[derive(Debug, Default)]
pub struct BufferedSink {
    responses: Vec<JsonRpcResponse>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_responses(self) -> Vec<JsonRpcResponse> {
        self.responses
    }
}

impl ResponseSink for BufferedSink {
    fn send_result(&mut self, mut result: Value, id: RequestId, meta: Option<Metadata>) {
        let meta = meta.as_ref().and_then(metadata::format);
        if let (Some(meta), Some(object)) = (meta, result.as_object_mut()) {
            object.insert("_meta".to_string(), Value::Object(meta));
        }
        self.responses.push(JsonRpcResponse::success(id, result));
    }

    fn send_error(&mut self, code: i32, message: String, id: RequestId) {
        self.responses
            .push(JsonRpcResponse::error(id, JsonRpcError::new(code, message)));
    }
}

/// MCP tool server.
///
/// Holds no per-session state: every request is handled on its own.
pub struct McpServer {
    config: Config,
    registry: ToolRegistry,
    capabilities: Value,
}

impl McpServer {
    /// Create a server with an empty registry
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: ToolRegistry::new(),
            capabilities: json!({"tools": {}}),
        }
    }

    /// Replace the `capabilities` value returned by `initialize`
    pub fn with_capabilities(mut self, capabilities: Value) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    pub fn register_tool<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.registry.register(tool)
    }

    /// Handle one raw JSON-RPC message
    pub fn handle_request(&self, message: &str, sink: &mut dyn ResponseSink) -> Disposition {
        let envelope: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable message");
                return reply_error(sink, &McpError::InvalidRequest, RequestId::null());
            }
        };

        let Some(object) = envelope.as_object() else {
            tracing::warn!("Message is not a JSON object");
            return reply_error(sink, &McpError::InvalidRequest, RequestId::null());
        };

        // A reply from the peer; never dispatch it as a request.
        if object.contains_key("result") || object.contains_key("error") {
            tracing::debug!("Ignoring response from peer");
            return Disposition::NoResponse;
        }

        let id = object.get("id").cloned().map(RequestId).unwrap_or_default();

        let Some(method) = object.get("method").and_then(Value::as_str) else {
            tracing::warn!(id = %id.0, "Request without method");
            return reply_error(sink, &McpError::InvalidRequest, id);
        };

        let params = object.get("params");

        if id.is_null() {
            tracing::debug!(method, "Handling notification");
            self.route(method, params, id, &mut DiscardSink);
            return Disposition::NoResponse;
        }

        self.route(method, params, id, sink)
    }

    /// Handle one message and return the wire response, if any
    pub fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let mut sink = BufferedSink::new();
        self.handle_request(message, &mut sink);
        sink.into_responses().into_iter().next()
    }

    fn route(
        &self,
        method: &str,
        params: Option<&Value>,
        id: RequestId,
        sink: &mut dyn ResponseSink,
    ) -> Disposition {
        let Some(known) = Method::parse(method) else {
            tracing::warn!(method, "Method not found");
            return reply_error(
                sink,
                &McpError::MethodNotFound {
                    method: method.to_string(),
                },
                id,
            );
        };

        tracing::debug!(method, "Dispatching request");
        let outcome = match known {
            Method::Ping => reply(sink, &json!({}), id.clone()),
            Method::Initialize => self.handle_initialize(params, id.clone(), sink),
            Method::Initialized => {
                tracing::info!("Client finished initialization");
                Ok(Disposition::NoResponse)
            }
            Method::ListTools => self.handle_list_tools(id.clone(), sink),
            Method::CallTool => self.handle_call_tool(params, id.clone(), sink),
        };

        outcome.unwrap_or_else(|e| {
            tracing::error!(method, error = %e, "Failed to encode response");
            reply_error(sink, &McpError::Internal, id)
        })
    }

    fn handle_initialize(
        &self,
        params: Option<&Value>,
        id: RequestId,
        sink: &mut dyn ResponseSink,
    ) -> Result<Disposition> {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .unwrap_or_default();

        if let Some(client) = &params.client_info {
            tracing::info!(client = %client.name, version = ?client.version, "Client connected");
        }

        let protocol_version = match params.protocol_version {
            Some(requested) if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested.as_str()) => {
                requested
            }
            _ => self.config.protocol_version.clone(),
        };

        let result = InitializeResult {
            protocol_version,
            capabilities: self.capabilities.clone(),
            server_info: ServerInfo {
                name: self.config.server_name.clone(),
                version: self.config.server_version.clone(),
            },
        };

        reply(sink, &result, id)
    }

    fn handle_list_tools(&self, id: RequestId, sink: &mut dyn ResponseSink) -> Result<Disposition> {
        let result = ListToolsResult {
            tools: self.registry.list_tools(),
        };

        reply(sink, &result, id)
    }

    fn handle_call_tool(
        &self,
        params: Option<&Value>,
        id: RequestId,
        sink: &mut dyn ResponseSink,
    ) -> Result<Disposition> {
        let params: CallToolParams = params
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .unwrap_or_default();

        let name = match params.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Ok(reply_error(sink, &McpError::MissingToolName, id)),
        };

        if !self.registry.contains(name) {
            tracing::warn!(tool = name, "Tool not found");
            return Ok(reply_error(sink, &McpError::ToolNotFound { name: name.to_string() }, id));
        }

        let arguments = params.arguments.unwrap_or_else(|| Value::Object(Map::new()));

        match self.registry.invoke(name, &arguments) {
            Ok(output) => {
                let result = serde_json::to_value(output.to_call_result())?;
                sink.send_result(result, id, Some(metadata::sanitize(output.metadata())));
                Ok(Disposition::Replied)
            }
            Err(err) => {
                let err = McpError::from(err);
                match self.config.tool_error_policy {
                    ToolErrorPolicy::ProtocolError => Ok(reply_error(sink, &err, id)),
                    ToolErrorPolicy::ErrorResult => {
                        let result = serde_json::to_value(CallToolResult::error(err.to_string()))?;
                        sink.send_result(result, id, Some(Metadata::new()));
                        Ok(Disposition::Replied)
                    }
                }
            }
        }
    }

    /// Run the server on stdio
    pub async fn run_stdio(&self) -> Result<()> {
        tracing::info!(
            server = %self.config.server_name,
            tools = self.registry.len(),
            "Serving MCP over stdio"
        );
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches EOF.
    ///
    /// Lines that are not valid UTF-8 get an `Invalid Request` reply like any
    /// other unparsable message; only read and write failures end the loop.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_message(line),
                Err(e) => {
                    tracing::warn!(error = %e, "Message is not valid UTF-8");
                    let mut sink = BufferedSink::new();
                    reply_error(&mut sink, &McpError::InvalidRequest, RequestId::null());
                    sink.into_responses().into_iter().next()
                }
            };

            if let Some(response) = response {
                let mut encoded = serde_json::to_string(&response)?;
                encoded.push('\n');
                writer.write_all(encoded.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }
}

fn reply<T: Serialize>(
    sink: &mut dyn ResponseSink,
    payload: &T,
    id: RequestId,
) -> Result<Disposition> {
    sink.send_result(serde_json::to_value(payload)?, id, None);
    Ok(Disposition::Replied)
}

fn reply_error(sink: &mut dyn ResponseSink, err: &McpError, id: RequestId) -> Disposition {
    sink.send_error(err.code(), err.to_string(), id);
    Disposition::Replied
}
