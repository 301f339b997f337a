//! Integration tests for the MCP tool server
//!
//! These tests drive the dispatcher with raw JSON-RPC text and record what
//! it sends back through the response sink.

use serde_json::{json, Map, Value};

use mcp_tool_server::config::{Config, ToolErrorPolicy};
use mcp_tool_server::mcp::metadata::Metadata;
use mcp_tool_server::mcp::schema::{ArgumentSchema, Field, FieldType};
use mcp_tool_server::mcp::server::{Disposition, McpServer, ResponseSink};
use mcp_tool_server::mcp::tools::{Tool, ToolAnnotations, ToolOutput};
use mcp_tool_server::mcp::types::RequestId;

/// Helper to create a JSON-RPC request
fn make_request(id: i64, method: &str, params: Option<Value>) -> String {
    let mut request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(p) = params {
        request["params"] = p;
    }
    request.to_string()
}

#[derive(Debug, Default)]
struct RecordingSink {
    results: Vec<(Value, RequestId, Option<Metadata>)>,
    errors: Vec<(i32, String, RequestId)>,
}

impl ResponseSink for RecordingSink {
    fn send_result(&mut self, result: Value, id: RequestId, meta: Option<Metadata>) {
        self.results.push((result, id, meta));
    }

    fn send_error(&mut self, code: i32, message: String, id: RequestId) {
        self.errors.push((code, message, id));
    }
}

impl RecordingSink {
    fn single_result(&self) -> &(Value, RequestId, Option<Metadata>) {
        assert!(self.errors.is_empty(), "unexpected errors: {:?}", self.errors);
        assert_eq!(self.results.len(), 1);
        &self.results[0]
    }

    fn single_error(&self) -> &(i32, String, RequestId) {
        assert!(self.results.is_empty(), "unexpected results: {:?}", self.results);
        assert_eq!(self.errors.len(), 1);
        &self.errors[0]
    }
}

struct TestTool;

impl Tool for TestTool {
    fn name(&self) -> &str {
        "test-tool"
    }

    fn description(&self) -> &str {
        "A test tool"
    }

    fn argument_schema(&self) -> Option<ArgumentSchema> {
        Some(
            ArgumentSchema::new().field(
                Field::required("name", FieldType::String)
                    .filled()
                    .description("Name"),
            ),
        )
    }

    fn invoke(&self, args: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        let name = args.get("name").and_then(Value::as_str).unwrap_or_default();
        Ok(format!("Hello, {}!", name).into())
    }
}

struct NestedTool;

impl Tool for NestedTool {
    fn name(&self) -> &str {
        "nested-tool"
    }

    fn description(&self) -> &str {
        "A tool with a nested schema"
    }

    fn argument_schema(&self) -> Option<ArgumentSchema> {
        let user = ArgumentSchema::new()
            .field(
                Field::required("name", FieldType::String)
                    .filled()
                    .description("User name"),
            )
            .field(
                Field::required("email", FieldType::String)
                    .filled()
                    .description("User email"),
            );
        Some(
            ArgumentSchema::new()
                .field(Field::required("user", FieldType::object(user)).description("The user")),
        )
    }

    fn invoke(&self, _args: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        Ok("created".into())
    }
}

struct AnnotatedTool;

impl Tool for AnnotatedTool {
    fn name(&self) -> &str {
        "annotated-tool"
    }

    fn description(&self) -> &str {
        "A tool with annotations"
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(
            ToolAnnotations::new()
                .title("X")
                .read_only_hint(true)
                .open_world_hint(true),
        )
    }

    fn invoke(&self, _args: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        Ok("ok".into())
    }
}

struct FailingTool;

impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing-tool"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn invoke(&self, _args: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        anyhow::bail!("backend unavailable")
    }
}

struct MetaTool;

impl Tool for MetaTool {
    fn name(&self) -> &str {
        "meta-tool"
    }

    fn description(&self) -> &str {
        "Returns metadata"
    }

    fn invoke(&self, _args: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        let mut meta = Metadata::new();
        meta.insert("trace_id".to_string(), json!("abc"));
        Ok(ToolOutput::text("done").with_metadata(meta)?)
    }
}

fn server_with(config: Config) -> McpServer {
    let mut server = McpServer::new(config);
    server.register_tool(TestTool).unwrap();
    server.register_tool(NestedTool).unwrap();
    server.register_tool(FailingTool).unwrap();
    server.register_tool(MetaTool).unwrap();
    server
}

fn server() -> McpServer {
    server_with(Config::default())
}

fn handle(server: &McpServer, message: &str) -> (Disposition, RecordingSink) {
    let mut sink = RecordingSink::default();
    let disposition = server.handle_request(message, &mut sink);
    (disposition, sink)
}

mod mcp_protocol_tests {
    use super::*;

    #[test]
    fn test_ping() {
        let (disposition, sink) = handle(&server(), &make_request(7, "ping", None));
        assert_eq!(disposition, Disposition::Replied);

        let (result, id, meta) = sink.single_result();
        assert_eq!(result, &json!({}));
        assert_eq!(id, &RequestId::from(7));
        assert!(meta.is_none());
    }

    #[test]
    fn test_string_id_is_echoed() {
        let (_, sink) = handle(&server(), r#"{"jsonrpc":"2.0","id":"req-1","method":"ping"}"#);
        assert_eq!(sink.single_result().1, RequestId::from("req-1"));
    }

    #[test]
    fn test_initialize() {
        let server = server().with_capabilities(json!({"tools": {"listChanged": false}}));
        let (_, sink) = handle(
            &server,
            &make_request(
                1,
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "clientInfo": {"name": "test-client", "version": "1.0.0"},
                    "capabilities": {}
                })),
            ),
        );

        let (result, _, _) = sink.single_result();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["capabilities"], json!({"tools": {"listChanged": false}}));
        assert_eq!(result["serverInfo"]["name"], "mcp-tool-server");
        assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_initialize_unknown_version_falls_back() {
        let (_, sink) = handle(
            &server(),
            &make_request(1, "initialize", Some(json!({"protocolVersion": "1999-01-01"}))),
        );
        let (result, _, _) = sink.single_result();
        assert_eq!(result["protocolVersion"], Config::default().protocol_version);
        assert_eq!(result["capabilities"], json!({"tools": {}}));
    }

    #[test]
    fn test_initialized_notification() {
        let (disposition, sink) = handle(
            &server(),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        );
        assert_eq!(disposition, Disposition::NoResponse);
        assert!(sink.results.is_empty());
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn test_peer_response_is_ignored() {
        for message in [
            r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#,
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-1,"message":"nope"}}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":"ping","result":{}}"#,
        ] {
            let (disposition, sink) = handle(&server(), message);
            assert_eq!(disposition, Disposition::NoResponse);
            assert!(sink.results.is_empty());
            assert!(sink.errors.is_empty());
        }
    }

    #[test]
    fn test_unknown_method() {
        let (_, sink) = handle(&server(), &make_request(3, "unknown", None));
        let (code, message, id) = sink.single_error();
        assert_eq!(*code, -32601);
        assert_eq!(message, "Method not found: unknown");
        assert_eq!(id, &RequestId::from(3));
    }

    #[test]
    fn test_method_lookup_is_case_sensitive() {
        let (_, sink) = handle(&server(), &make_request(3, "PING", None));
        assert_eq!(sink.single_error().0, -32601);
    }

    #[test]
    fn test_malformed_json() {
        let (disposition, sink) = handle(&server(), "{not json");
        assert_eq!(disposition, Disposition::Replied);

        let (code, message, id) = sink.single_error();
        assert_eq!(*code, -32600);
        assert_eq!(message, "Invalid Request");
        assert!(id.is_null());
    }

    #[test]
    fn test_envelope_without_method() {
        let (_, sink) = handle(&server(), r#"{"id":1}"#);
        let (code, message, id) = sink.single_error();
        assert_eq!(*code, -32600);
        assert_eq!(message, "Invalid Request");
        assert_eq!(id, &RequestId::from(1));

        let (_, sink) = handle(&server(), r#"{"jsonrpc":"2.0"}"#);
        assert!(sink.single_error().2.is_null());

        let (_, sink) = handle(&server(), "[1, 2, 3]");
        assert_eq!(sink.single_error().0, -32600);
    }

    #[test]
    fn test_non_string_method_echoes_id() {
        let (disposition, sink) = handle(&server(), r#"{"jsonrpc":"2.0","id":2,"method":5}"#);
        assert_eq!(disposition, Disposition::Replied);

        let (code, message, id) = sink.single_error();
        assert_eq!(*code, -32600);
        assert_eq!(message, "Invalid Request");
        assert_eq!(id, &RequestId::from(2));
        assert!(sink.results.is_empty());
    }
}

mod tools_list_tests {
    use super::*;

    fn list(server: &McpServer) -> Vec<Value> {
        let (_, sink) = handle(server, &make_request(2, "tools/list", None));
        sink.single_result().0["tools"].as_array().unwrap().clone()
    }

    #[test]
    fn test_list_two_tools_with_nested_schema() {
        let mut server = McpServer::new(Config::default());
        server.register_tool(TestTool).unwrap();
        server.register_tool(NestedTool).unwrap();

        let tools = list(&server);
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "test-tool");
        assert_eq!(tools[0]["description"], "A test tool");
        assert_eq!(tools[0]["inputSchema"]["properties"]["name"]["description"], "Name");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["name"]));

        let user = &tools[1]["inputSchema"]["properties"]["user"];
        assert_eq!(user["type"], "object");
        assert!(user["properties"].get("name").is_some());
        assert!(user["properties"].get("email").is_some());
    }

    #[test]
    fn test_list_annotations() {
        let mut server = McpServer::new(Config::default());
        server.register_tool(AnnotatedTool).unwrap();
        server.register_tool(TestTool).unwrap();

        let tools = list(&server);
        assert_eq!(
            tools[0]["annotations"],
            json!({"title": "X", "readOnlyHint": true, "openWorldHint": true})
        );
        assert!(tools[1].get("annotations").is_none());
    }

    #[test]
    fn test_list_follows_registration_order() {
        let names: Vec<Value> = list(&server()).iter().map(|t| t["name"].clone()).collect();
        assert_eq!(names, vec!["test-tool", "nested-tool", "failing-tool", "meta-tool"]);
    }

    #[test]
    fn test_list_tool_without_schema() {
        let mut server = McpServer::new(Config::default());
        server.register_tool(FailingTool).unwrap();
        assert_eq!(list(&server)[0]["inputSchema"], json!({"type": "object", "properties": {}}));
    }
}

mod tools_call_tests {
    use super::*;

    #[test]
    fn test_call_success() {
        let (_, sink) = handle(
            &server(),
            &make_request(
                4,
                "tools/call",
                Some(json!({"name": "test-tool", "arguments": {"name": "World"}})),
            ),
        );

        let (result, id, meta) = sink.single_result();
        assert_eq!(
            result,
            &json!({"content": [{"type": "text", "text": "Hello, World!"}], "isError": false})
        );
        assert_eq!(id, &RequestId::from(4));
        assert_eq!(meta, &Some(Metadata::new()));
    }

    #[test]
    fn test_call_passes_tool_metadata() {
        let (_, sink) = handle(
            &server(),
            &make_request(4, "tools/call", Some(json!({"name": "meta-tool"}))),
        );
        let (_, _, meta) = sink.single_result();
        assert_eq!(meta.as_ref().unwrap()["trace_id"], "abc");
    }

    #[test]
    fn test_call_missing_name() {
        for params in [
            None,
            Some(json!({})),
            Some(json!({"name": "  "})),
            Some(json!({"arguments": {}})),
        ] {
            let (_, sink) = handle(&server(), &make_request(5, "tools/call", params));
            let (code, message, id) = sink.single_error();
            assert_eq!(*code, -32602);
            assert_eq!(message, "Invalid params: missing tool name");
            assert_eq!(id, &RequestId::from(5));
        }
    }

    #[test]
    fn test_call_unknown_tool() {
        let (_, sink) = handle(
            &server(),
            &make_request(6, "tools/call", Some(json!({"name": "non-existent-tool"}))),
        );
        let (code, message, _) = sink.single_error();
        assert_eq!(*code, -32602);
        assert_eq!(message, "Tool not found: non-existent-tool");
    }

    #[test]
    fn test_call_invalid_arguments() {
        let (_, sink) = handle(
            &server(),
            &make_request(
                7,
                "tools/call",
                Some(json!({"name": "nested-tool", "arguments": {"user": {"name": "Ada"}}})),
            ),
        );
        let (code, message, _) = sink.single_error();
        assert_eq!(*code, -32602);
        assert_eq!(message, "Invalid params: user.email is missing");
    }

    #[test]
    fn test_call_handler_failure_as_protocol_error() {
        let (_, sink) = handle(
            &server(),
            &make_request(8, "tools/call", Some(json!({"name": "failing-tool"}))),
        );
        let (code, message, _) = sink.single_error();
        assert_eq!(*code, -32602);
        assert!(message.contains("backend unavailable"));
        assert!(message.contains("failing-tool"));
    }

    #[test]
    fn test_call_handler_failure_as_error_result() {
        let server = server_with(
            Config::default().with_tool_error_policy(ToolErrorPolicy::ErrorResult),
        );
        let (_, sink) = handle(
            &server,
            &make_request(8, "tools/call", Some(json!({"name": "failing-tool"}))),
        );

        let (result, _, meta) = sink.single_result();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("backend unavailable"));
        assert_eq!(meta, &Some(Metadata::new()));
    }

    #[test]
    fn test_error_result_policy_keeps_unknown_tool_as_protocol_error() {
        let server = server_with(
            Config::default().with_tool_error_policy(ToolErrorPolicy::ErrorResult),
        );
        let (_, sink) =
            handle(&server, &make_request(9, "tools/call", Some(json!({"name": "nope"}))));
        assert_eq!(sink.single_error().1, "Tool not found: nope");
    }
}

mod transport_tests {
    use super::*;
    use mcp_tool_server::mcp::types::JsonRpcResponse;

    #[tokio::test]
    async fn test_serve_skips_blank_lines_and_notifications() {
        let input = [
            make_request(1, "ping", None),
            String::new(),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#.to_string(),
            make_request(2, "tools/call", Some(json!({"name": "meta-tool"}))),
            "garbage".to_string(),
        ]
        .join("\n");

        let mut output = Vec::new();
        server().serve(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<JsonRpcResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].result, Some(json!({})));

        let call = responses[1].result.as_ref().unwrap();
        assert_eq!(call["_meta"], json!({"trace_id": "abc"}));
        assert_eq!(call["content"][0]["text"], "done");

        let error = responses[2].error.as_ref().unwrap();
        assert_eq!(error.code, -32600);
        assert!(responses[2].id.is_null());
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8() {
        let mut input = make_request(1, "ping", None).into_bytes();
        input.push(b'\n');
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(make_request(2, "ping", None).as_bytes());
        input.push(b'\n');

        let mut output = Vec::new();
        server().serve(&input[..], &mut output).await.unwrap();

        let responses: Vec<JsonRpcResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].id, RequestId::from(1));
        assert_eq!(responses[0].result, Some(json!({})));

        let error = responses[1].error.as_ref().unwrap();
        assert_eq!(error.code, -32600);
        assert_eq!(error.message, "Invalid Request");
        assert!(responses[1].id.is_null());

        assert_eq!(responses[2].id, RequestId::from(2));
        assert_eq!(responses[2].result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_serve_omits_empty_meta() {
        let request = make_request(
            1,
            "tools/call",
            Some(json!({"name": "test-tool", "arguments": {"name": "World"}})),
        );
        let reader = tokio_test::io::Builder::new()
            .read(request.as_bytes())
            .read(b"\n")
            .build();
        let writer = tokio_test::io::Builder::new()
            .write(
                concat!(
                    r#"{"jsonrpc":"2.0","id":1,"result":"#,
                    r#"{"content":[{"text":"Hello, World!","type":"text"}],"isError":false}}"#
                )
                .as_bytes(),
            )
            .write(b"\n")
            .build();

        server()
            .serve(tokio::io::BufReader::new(reader), writer)
            .await
            .unwrap();
    }
}
