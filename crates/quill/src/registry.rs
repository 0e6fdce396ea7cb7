use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall, ToolOutput};
use crate::toolbox::Toolbox;

/// Maps tool names to their declaration and the toolbox that handles them.
///
/// All declarations are checked once when the registry is built, so a bad schema
/// fails at startup instead of in the middle of a conversation.
pub struct ToolRegistry {
    toolboxes: Vec<Arc<dyn Toolbox>>,
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(toolboxes: Vec<Arc<dyn Toolbox>>) -> AgentResult<Self> {
        let name_re = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
        let mut tools = Vec::new();
        let mut index = HashMap::new();

        for (position, toolbox) in toolboxes.iter().enumerate() {
            for tool in toolbox.tools() {
                if !name_re.is_match(&tool.name) {
                    return Err(AgentError::InvalidRegistration(format!(
                        "tool name '{}' must match [a-zA-Z0-9_-]+",
                        tool.name
                    )));
                }
                validate_schema(tool)?;
                if index.insert(tool.name.clone(), position).is_some() {
                    return Err(AgentError::InvalidRegistration(format!(
                        "tool '{}' is registered twice",
                        tool.name
                    )));
                }
                tools.push(tool.clone());
            }
        }

        tracing::info!(
            toolboxes = toolboxes.len(),
            tools = tools.len(),
            "tool registry ready"
        );
        Ok(Self {
            toolboxes,
            tools,
            index,
        })
    }

    /// Declarations of every registered tool, in registration order
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Route a tool call to its toolbox after checking the arguments
    pub async fn dispatch(&self, tool_call: AgentResult<ToolCall>) -> AgentResult<ToolOutput> {
        let call = tool_call?;
        let position = *self
            .index
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;
        validate_arguments(&tool.input_schema, &call.arguments)?;

        let toolbox = &self.toolboxes[position];
        tracing::info!(tool = %call.name, toolbox = toolbox.name(), "calling tool");
        toolbox.call(call).await
    }
}

fn validate_schema(tool: &Tool) -> AgentResult<()> {
    let invalid = |reason: &str| {
        AgentError::InvalidRegistration(format!("tool '{}': {}", tool.name, reason))
    };

    let schema = tool
        .input_schema
        .as_object()
        .ok_or_else(|| invalid("schema must be a JSON object"))?;
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(invalid("schema type must be \"object\""));
    }

    let empty = Map::new();
    let properties = match schema.get("properties") {
        None => &empty,
        Some(p) => p
            .as_object()
            .ok_or_else(|| invalid("properties must be an object"))?,
    };

    if let Some(required) = schema.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| invalid("required must be an array"))?;
        for name in required {
            let name = name
                .as_str()
                .ok_or_else(|| invalid("required entries must be strings"))?;
            if !properties.contains_key(name) {
                return Err(invalid(&format!(
                    "required parameter '{}' is not declared",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Check call arguments against the declared schema: required keys are present and
/// declared primitive types match. Undeclared keys are passed through untouched.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> AgentResult<()> {
    let args = arguments.as_object().ok_or_else(|| {
        AgentError::InvalidParameters(format!("arguments must be an object, got {}", arguments))
    })?;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if args.get(name).map_or(true, Value::is_null) {
                return Err(AgentError::InvalidParameters(format!(
                    "missing required parameter '{}'",
                    name
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, value) in args {
            if value.is_null() {
                continue;
            }
            let Some(expected) = properties
                .get(name)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            let matches = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "object" => value.is_object(),
                "array" => value.is_array(),
                _ => true,
            };
            if !matches {
                return Err(AgentError::InvalidParameters(format!(
                    "parameter '{}' must be of type {}",
                    name, expected
                )));
            }
        }
    }
    Ok(())
}
