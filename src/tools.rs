//! Tool definition and execution, served to the Agent CLI over the
//! in-process MCP tool server (`mcp.rs`).
//!
//! A [`Tool`] pairs a name/description/JSON-Schema with an async handler.
//! [`ToolBuilder`] is the fluent entry point, taking a plain JSON Schema
//! object (`{type, properties, required}`) for the tool's parameters.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};

type HandlerFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;
type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Generates the JSON Schema for a tool's input. The default path is a
/// caller-supplied `serde_json::Value`; implement this trait to derive one
/// from a Rust type instead.
pub trait SchemaGenerator {
    fn generate(&self) -> Value;
}

impl SchemaGenerator for Value {
    fn generate(&self) -> Value {
        self.clone()
    }
}

/// One tool the in-process MCP server can list and invoke.
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub schema: Value,
    handler: Handler,
}

impl Tool {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `{name, description, inputSchema}` shape `tools/list` returns.
    pub fn to_schema_entry(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.schema,
        })
    }

    pub async fn call(&self, arguments: Value) -> Result<String> {
        (self.handler)(arguments).await
    }
}

/// Fluent builder for a [`Tool`]:
/// `tool(name, description).schema(...).handler(...).build()`.
pub struct ToolBuilder {
    name: String,
    description: String,
    schema: Value,
    handler: Option<Handler>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        ToolBuilder {
            name: name.into(),
            description: description.into(),
            schema: serde_json::json!({ "type": "object", "properties": {} }),
            handler: None,
        }
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    pub fn schema_from(mut self, generator: &dyn SchemaGenerator) -> Self {
        self.schema = generator.generate();
        self
    }

    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |args| Box::pin(handler(args))));
        self
    }

    pub fn build(self) -> Tool {
        let handler = self.handler.unwrap_or_else(|| {
            Arc::new(|_args| {
                Box::pin(async { Err(Error::other("tool has no handler registered")) })
            })
        });
        Tool {
            name: self.name,
            description: self.description,
            schema: self.schema,
            handler,
        }
    }
}

/// Convenience entry point: `tool(name, description)`.
pub fn tool(name: impl Into<String>, description: impl Into<String>) -> ToolBuilder {
    ToolBuilder::new(name, description)
}

/// A snapshot of tools served by one [`crate::mcp::McpServer`].
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Tool>) -> Self {
        ToolRegistry { tools }
    }

    pub fn schema_list(&self) -> Vec<Value> {
        self.tools.iter().map(Tool::to_schema_entry).collect()
    }

    pub async fn call(&self, name: &str, arguments: Value) -> Result<String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::other(format!("no such tool: {name}")))?;
        tool.call(arguments).await
    }
}
