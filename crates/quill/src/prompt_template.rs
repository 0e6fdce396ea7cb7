use serde::Serialize;
use serde_json::json;
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::Tool;

/// Agent instructions, compiled into the binary so it runs from any directory
pub const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("prompts/system.md");

/// Render a tera template against any serializable context
pub fn render<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let context = Context::from_serialize(context_data)?;
    Tera::one_off(template, &context, false)
}

/// The system prompt with the given tools listed by name and description
pub fn system_prompt(tools: &[Tool]) -> Result<String, TeraError> {
    render(SYSTEM_PROMPT_TEMPLATE, &json!({ "tools": tools }))
}
