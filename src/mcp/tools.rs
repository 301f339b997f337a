//! Tool definitions and the tool registry
//!
//! Tools implement [`Tool`] and are registered once into a [`ToolRegistry`],
//! which lists them in registration order and runs them with validated
//! arguments.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{
    ConfigError, InvocationError, McpServerError, ReservedMetadataError, Result, ValidationError,
};
use crate::mcp::metadata::{self, Metadata};
use crate::mcp::schema::{empty_wire_schema, ArgumentSchema};
use crate::mcp::types;

/// A named, schema-described capability that clients can invoke
pub trait Tool: Send + Sync {
    /// Unique, case-sensitive tool name
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Expected arguments; `None` accepts any argument object
    fn argument_schema(&self) -> Option<ArgumentSchema> {
        None
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        None
    }

    /// Run the tool with arguments that already passed schema validation
    fn invoke(&self, args: &Map<String, Value>) -> anyhow::Result<ToolOutput>;
}

/// Presentation hints attached to a tool.
///
/// Keys are stored in snake_case and converted to camelCase when listed.
/// The server never interprets them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolAnnotations(Map<String, Value>);

impl ToolAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(self, title: impl Into<String>) -> Self {
        self.hint("title", Value::String(title.into()))
    }

    pub fn read_only_hint(self, value: bool) -> Self {
        self.hint("read_only_hint", Value::Bool(value))
    }

    pub fn destructive_hint(self, value: bool) -> Self {
        self.hint("destructive_hint", Value::Bool(value))
    }

    pub fn idempotent_hint(self, value: bool) -> Self {
        self.hint("idempotent_hint", Value::Bool(value))
    }

    pub fn open_world_hint(self, value: bool) -> Self {
        self.hint("open_world_hint", Value::Bool(value))
    }

    /// Set an arbitrary hint
    pub fn hint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hints keyed by their wire (camelCase) names
    pub fn to_wire(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(key, value)| (snake_to_camel(key), value.clone()))
            .collect()
    }
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Payload returned by a tool
#[derive(Debug, Clone, PartialEq)]
pub enum OutputContent {
    Text(String),
    Structured(Value),
}

/// What a tool hands back: content plus optional `_meta` entries
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    content: OutputContent,
    metadata: Metadata,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: OutputContent::Text(text.into()),
            metadata: Metadata::new(),
        }
    }

    pub fn structured(value: Value) -> Self {
        Self {
            content: OutputContent::Structured(value),
            metadata: Metadata::new(),
        }
    }

    /// Attach metadata, rejecting reserved keys
    pub fn with_metadata(
        mut self,
        meta: Metadata,
    ) -> std::result::Result<Self, ReservedMetadataError> {
        metadata::validate(&meta)?;
        self.metadata = metadata::merge([&self.metadata, &meta]);
        Ok(self)
    }

    pub fn content(&self) -> &OutputContent {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Text form used for the `text` content item
    pub fn to_text(&self) -> String {
        match &self.content {
            OutputContent::Text(text) => text.clone(),
            OutputContent::Structured(Value::String(text)) => text.clone(),
            OutputContent::Structured(value) => value.to_string(),
        }
    }

    /// Convert into a successful `tools/call` result
    pub fn to_call_result(&self) -> types::CallToolResult {
        let mut result = types::CallToolResult::text(self.to_text());
        if let OutputContent::Structured(value) = &self.content {
            result.structured_content = Some(value.clone());
        }
        result
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::text(text)
    }
}

/// Render a tool as a `tools/list` entry
pub fn describe(tool: &dyn Tool) -> types::Tool {
    types::Tool {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        input_schema: tool
            .argument_schema()
            .map(|schema| schema.to_wire_schema())
            .unwrap_or_else(empty_wire_schema),
        annotations: tool
            .annotations()
            .filter(|annotations| !annotations.is_empty())
            .map(|annotations| annotations.to_wire()),
    }
}

/// Name → tool map that remembers registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name in place
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(McpServerError::Config(ConfigError::InvalidConfig {
                message: "tool name must not be empty".to_string(),
            }));
        }

        match self.index.get(&name) {
            Some(&position) => {
                tracing::info!(tool = %name, "Replacing registered tool");
                self.tools[position] = tool;
            }
            None => {
                tracing::info!(tool = %name, "Registering tool");
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
        Ok(())
    }

    /// Remove a tool, returning it if it was registered
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let position = self.index.remove(name)?;
        let removed = self.tools.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&position| self.tools[position].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tools in registration order
    pub fn list(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|tool| tool.as_ref())
    }

    /// `tools/list` entries in registration order
    pub fn list_tools(&self) -> Vec<types::Tool> {
        self.list().map(describe).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate and run a tool.
    ///
    /// `null` arguments count as an empty object. Errors and panics raised
    /// by the handler come back as [`InvocationError::Handler`].
    pub fn invoke(
        &self,
        name: &str,
        args: &Value,
    ) -> std::result::Result<ToolOutput, InvocationError> {
        let tool = self.lookup(name).ok_or_else(|| InvocationError::ToolNotFound {
            name: name.to_string(),
        })?;

        let args = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => return Err(ValidationError::new("arguments", "must be an object").into()),
        };

        if let Some(schema) = tool.argument_schema() {
            schema.validate_arguments(&args)?;
        }

        tracing::debug!(tool = %name, "Invoking tool");
        let outcome = catch_unwind(AssertUnwindSafe(|| tool.invoke(&args)));

        let message = match outcome {
            Ok(Ok(output)) => return Ok(output),
            Ok(Err(err)) => format!("{:#}", err),
            Err(panic) => panic_message(panic.as_ref()),
        };

        tracing::warn!(tool = %name, error = %message, "Tool handler failed");
        Err(InvocationError::Handler {
            name: name.to_string(),
            message,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_string()
    }
}
