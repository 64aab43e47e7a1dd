//! In-process JSON-RPC 2.0 tool server, tunnelled through the Control
//! Channel's `mcp_message` subtype rather than its own stdio/HTTP transport.
//!
//! Hand-rolled on `serde_json::Value` instead of pulling in `rmcp`: that
//! crate's transport abstractions assume an actual channel of their own, but
//! here the whole exchange is a handful of JSON-RPC methods riding inside
//! another protocol's frames.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::tools::ToolRegistry;

const PROTOCOL_VERSION: &str = "2024-11-05";
const METHOD_NOT_FOUND: i64 = -32603;

/// Dispatches `mcp_message` payloads addressed to a registered server name.
#[async_trait]
pub trait McpMessageHandler: Send + Sync {
    async fn handle(&self, server_name: &str, message: Value) -> Result<Value>;
}

/// One in-process MCP server: a name, a version, and a tool registry.
pub struct McpServer {
    pub name: String,
    pub version: String,
    pub tools: ToolRegistry,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: ToolRegistry) -> Self {
        McpServer {
            name: name.into(),
            version: version.into(),
            tools,
        }
    }

    /// Handle one JSON-RPC request addressed to this server and produce the
    /// JSON-RPC response envelope (request id echoed verbatim).
    pub async fn handle_request(&self, request: Value) -> Value {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");

        match method {
            "initialize" => rpc_result(
                id,
                serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "serverInfo": { "name": self.name, "version": self.version },
                }),
            ),
            "notifications/initialized" => rpc_result(id, serde_json::json!({})),
            "tools/list" => rpc_result(
                id,
                serde_json::json!({ "tools": self.tools.schema_list() }),
            ),
            "tools/call" => self.handle_tool_call(id, request.get("params")).await,
            other => rpc_error(id, METHOD_NOT_FOUND, format!("Unknown method: {other}")),
        }
    }

    async fn handle_tool_call(&self, id: Value, params: Option<&Value>) -> Value {
        let Some(params) = params else {
            return rpc_error(id, METHOD_NOT_FOUND, "tools/call missing params".to_string());
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return rpc_error(id, METHOD_NOT_FOUND, "tools/call missing name".to_string());
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.tools.call(name, arguments).await {
            Ok(text) => rpc_result(
                id,
                serde_json::json!({
                    "content": [{ "type": "text", "text": text }],
                    "isError": false,
                }),
            ),
            Err(e) => rpc_result(
                id,
                serde_json::json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true,
                }),
            ),
        }
    }
}

fn rpc_result(id: Value, result: Value) -> Value {
    serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn rpc_error(id: Value, code: i64, message: String) -> Value {
    serde_json::json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// Routes `mcp_message` payloads by server name across every registered
/// [`McpServer`].
pub struct McpServerRegistry {
    servers: Vec<McpServer>,
}

impl McpServerRegistry {
    pub fn new(servers: Vec<McpServer>) -> Self {
        McpServerRegistry { servers }
    }

    fn find(&self, name: &str) -> Option<&McpServer> {
        self.servers.iter().find(|s| s.name == name)
    }
}

#[async_trait]
impl McpMessageHandler for McpServerRegistry {
    async fn handle(&self, server_name: &str, message: Value) -> Result<Value> {
        match self.find(server_name) {
            Some(server) => Ok(server.handle_request(message).await),
            None => {
                let id = message.get("id").cloned().unwrap_or(Value::Null);
                Ok(rpc_error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Unknown server: {server_name}"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolBuilder;

    fn calc_server() -> McpServer {
        let add = ToolBuilder::new("add", "Add two numbers")
            .schema(serde_json::json!({
                "type": "object",
                "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                "required": ["a", "b"],
            }))
            .handler(|args: Value| async move {
                let a = args["a"].as_f64().unwrap_or(0.0);
                let b = args["b"].as_f64().unwrap_or(0.0);
                Ok((a + b).to_string())
            })
            .build();
        McpServer::new("calc", "0.1.0", ToolRegistry::new(vec![add]))
    }

    #[tokio::test]
    async fn initialize_reports_protocol_version() {
        let server = calc_server();
        let response = server
            .handle_request(serde_json::json!({"jsonrpc":"2.0","id":1,"method":"initialize"}))
            .await;
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn tools_call_echoes_id_and_computes_result() {
        let server = calc_server();
        let response = server
            .handle_request(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": {"name": "add", "arguments": {"a": 2, "b": 3}},
            }))
            .await;
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"]["content"][0]["text"], "5");
        assert_eq!(response["result"]["isError"], false);
    }

    #[tokio::test]
    async fn unknown_method_returns_error() {
        let server = calc_server();
        let response = server
            .handle_request(serde_json::json!({"jsonrpc":"2.0","id":1,"method":"bogus"}))
            .await;
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn registry_routes_by_server_name() {
        let registry = McpServerRegistry::new(vec![calc_server()]);
        let response = registry
            .handle(
                "calc",
                serde_json::json!({"jsonrpc":"2.0","id":1,"method":"tools/list"}),
            )
            .await
            .unwrap();
        assert_eq!(response["result"]["tools"][0]["name"], "add");
    }

    #[tokio::test]
    async fn registry_unknown_server_errors() {
        let registry = McpServerRegistry::new(vec![calc_server()]);
        let response = registry
            .handle("missing", serde_json::json!({"jsonrpc":"2.0","id":1,"method":"tools/list"}))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }
}
