use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

use crate::errors::AgentError;
use crate::models::content::{Content, ImageContent};
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

/// Convert internal Message format to the gemini `contents` format
///
/// Function responses must carry the function name, so tool responses are paired
/// with the request of the same id. Requests the model got wrong have no function
/// call to pair with and are sent back as plain text instead.
pub fn messages_to_google_spec(messages: &[Message]) -> Vec<Value> {
    let call_names: HashMap<&str, &str> = messages
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|c| c.as_tool_request())
        .filter_map(|r| r.tool_call.as_ref().ok().map(|c| (r.id.as_str(), c.name.as_str())))
        .collect();

    let mut contents = Vec::new();

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        let mut parts = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.text.is_empty() {
                        parts.push(json!({"text": text.text}));
                    }
                }
                MessageContent::Image(image) => parts.push(convert_image(image)),
                MessageContent::ToolRequest(request) => match &request.tool_call {
                    Ok(tool_call) => parts.push(json!({
                        "functionCall": {
                            "name": tool_call.name,
                            "args": tool_call.arguments,
                        }
                    })),
                    Err(e) => parts.push(json!({
                        "text": format!("(tool request {} could not be used: {})", request.id, e)
                    })),
                },
                MessageContent::ToolResponse(response) => {
                    let name = call_names.get(response.id.as_str());
                    match (&response.tool_result, name) {
                        (Ok(contents), Some(name)) => {
                            let text = contents
                                .iter()
                                .filter_map(|c| c.as_text())
                                .collect::<Vec<_>>()
                                .join("\n");
                            parts.push(json!({
                                "functionResponse": {
                                    "name": name,
                                    "response": {"result": text},
                                }
                            }));
                            // Images from tools follow as their own parts
                            for content in contents {
                                if let Content::Image(image) = content {
                                    parts.push(convert_image(image));
                                }
                            }
                        }
                        (Err(e), Some(name)) => parts.push(json!({
                            "functionResponse": {
                                "name": name,
                                "response": {
                                    "error": format!("The tool call returned the following error:\n{}", e)
                                },
                            }
                        })),
                        (Ok(_), None) => {
                            if let Some(text) = content.as_tool_response_text() {
                                parts.push(json!({"text": text}));
                            }
                        }
                        (Err(e), None) => parts.push(json!({
                            "text": format!("The tool call returned the following error:\n{}", e)
                        })),
                    }
                }
            }
        }

        if !parts.is_empty() {
            contents.push(json!({"role": role, "parts": parts}));
        }
    }

    contents
}

/// Convert an image content into an inline data part
pub fn convert_image(image: &ImageContent) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.data,
        }
    })
}

/// Convert internal Tool format to gemini function declarations
pub fn tools_to_google_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut declarations = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        let mut declaration = json!({
            "name": tool.name,
            "description": tool.description,
        });
        // Gemini rejects object schemas without properties
        let has_properties = tool
            .input_schema
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|p| !p.is_empty());
        if has_properties {
            declaration["parameters"] = tool.input_schema.clone();
        }
        declarations.push(declaration);
    }

    if declarations.is_empty() {
        return Ok(vec![]);
    }
    Ok(vec![json!({"functionDeclarations": declarations})])
}

/// Convert a gemini `generateContent` response to internal Message format
pub fn google_response_to_message(response: Value) -> Result<Message> {
    let candidate = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = response["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates returned");
            anyhow!("Model returned no candidates: {}", reason)
        })?;

    let mut content = Vec::new();
    let parts = candidate["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            content.push(MessageContent::text(text));
        } else if let Some(inline) = part.get("inlineData") {
            let data = inline["data"].as_str().unwrap_or_default();
            let mime_type = inline["mimeType"].as_str().unwrap_or("image/png");
            content.push(MessageContent::image(data, mime_type));
        } else if let Some(call) = part.get("functionCall") {
            let id = call
                .get("id")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let name = call["name"].as_str().unwrap_or_default().to_string();

            if !is_valid_function_name(&name) {
                let error = AgentError::ToolNotFound(format!(
                    "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                    name
                ));
                content.push(MessageContent::tool_request(id, Err(error)));
                continue;
            }

            match call.get("args").cloned().unwrap_or_else(|| json!({})) {
                Value::Object(args) => {
                    content.push(MessageContent::tool_request(
                        id,
                        Ok(ToolCall::new(name, Value::Object(args))),
                    ));
                }
                Value::Null => {
                    content.push(MessageContent::tool_request(
                        id,
                        Ok(ToolCall::new(name, Value::Object(Map::new()))),
                    ));
                }
                other => {
                    let error = AgentError::InvalidParameters(format!(
                        "Could not interpret tool use parameters for id {}: expected an object, got {}",
                        id, other
                    ));
                    content.push(MessageContent::tool_request(id, Err(error)));
                }
            }
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

fn is_valid_function_name(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
    re.is_match(name)
}
