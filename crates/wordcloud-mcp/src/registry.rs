//! Tool registry.
//!
//! Tools are registered once at startup with a definition (name, description,
//! JSON schema) and a handler. The registry keeps registration order for
//! `tools/list` and dispatches `tools/call` by name.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::protocol::ToolDefinition;

/// Errors surfaced by tool registration and invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool already registered: {0}")]
    DuplicateName(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    State(#[from] wordcloud_core::Error),
}

/// Result of a tool handler.
pub type ToolResult = Result<Value, ToolError>;

type Handler = Box<dyn Fn(Value) -> ToolResult + Send + Sync>;

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Handler,
}

/// Ordered catalogue of tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register<F>(&mut self, definition: ToolDefinition, handler: F) -> Result<(), ToolError>
    where
        F: Fn(Value) -> ToolResult + Send + Sync + 'static,
    {
        if self.by_name.contains_key(&definition.name) {
            return Err(ToolError::DuplicateName(definition.name));
        }

        tracing::debug!(tool = %definition.name, "Registered tool");
        self.by_name
            .insert(definition.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Tool definitions in registration order.
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    /// Call a tool by name. Arguments are passed through untouched.
    pub fn invoke(&self, name: &str, arguments: Value) -> ToolResult {
        let index = self
            .by_name
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        (self.tools[*index].handler)(arguments)
    }
}

/// Decode tool arguments into a typed struct.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

// =============================================================================
// Schema builder
// =============================================================================

/// One tool parameter in a JSON schema.
#[derive(Debug, Clone)]
pub struct Param {
    name: &'static str,
    kind: &'static str,
    description: &'static str,
    default: Option<Value>,
    required: bool,
}

impl Param {
    fn new(name: &'static str, kind: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            default: None,
            required: false,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, "string", description)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, "number", description)
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, "boolean", description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Build a tool definition with an object schema over `params`.
pub fn tool(name: &str, description: &str, params: &[Param]) -> ToolDefinition {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        let mut schema = json!({
            "type": param.kind,
            "description": param.description,
        });
        if let Some(default) = &param.default {
            schema["default"] = default.clone();
        }
        properties.insert(param.name.to_string(), schema);
        if param.required {
            required.push(param.name);
        }
    }

    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}
