use super::content::{Content, ImageContent, TextContent};
use super::role::Role;
use super::tool::{Artifact, ToolCall};
use crate::errors::{AgentError, AgentResult};
use chrono::Utc;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub tool_call: AgentResult<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub tool_result: AgentResult<Vec<Content>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// Content passed inside a message, which can be both simple content and tool content
pub enum MessageContent {
    Text(TextContent),
    Image(ImageContent),
    ToolRequest(ToolRequest),
    ToolResponse(ToolResponse),
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text(TextContent { text: text.into() })
    }

    pub fn image<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        MessageContent::Image(ImageContent {
            data: data.into(),
            mime_type: mime_type.into(),
        })
    }

    pub fn tool_request<S: Into<String>>(id: S, tool_call: AgentResult<ToolCall>) -> Self {
        MessageContent::ToolRequest(ToolRequest {
            id: id.into(),
            tool_call,
        })
    }

    pub fn tool_response<S: Into<String>>(id: S, tool_result: AgentResult<Vec<Content>>) -> Self {
        MessageContent::ToolResponse(ToolResponse {
            id: id.into(),
            tool_result,
            artifacts: Vec::new(),
        })
    }

    pub fn as_tool_request(&self) -> Option<&ToolRequest> {
        if let MessageContent::ToolRequest(ref tool_request) = self {
            Some(tool_request)
        } else {
            None
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResponse> {
        if let MessageContent::ToolResponse(ref tool_response) = self {
            Some(tool_response)
        } else {
            None
        }
    }

    pub fn as_tool_response_text(&self) -> Option<String> {
        if let Some(tool_response) = self.as_tool_response() {
            if let Ok(contents) = &tool_response.tool_result {
                let texts: Vec<String> = contents
                    .iter()
                    .filter_map(|content| content.as_text().map(String::from))
                    .collect();
                if !texts.is_empty() {
                    return Some(texts.join("\n"));
                }
            }
        }
        None
    }

    /// Get the text content if this is a TextContent variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    /// Get the image content if this is an ImageContent variant
    pub fn as_image(&self) -> Option<&ImageContent> {
        match self {
            MessageContent::Image(image) => Some(image),
            _ => None,
        }
    }
}

impl From<Content> for MessageContent {
    fn from(content: Content) -> Self {
        match content {
            Content::Text(text) => MessageContent::Text(text),
            Content::Image(image) => MessageContent::Image(image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    pub created: i64,
    pub content: Vec<MessageContent>,
}

impl Message {
    /// Create a message with the given content, rejecting an empty content list
    pub fn new(role: Role, content: Vec<MessageContent>) -> AgentResult<Self> {
        if content.is_empty() {
            return Err(AgentError::InvalidParameters(
                "a message needs at least one content part".into(),
            ));
        }
        Ok(Message {
            role,
            created: Utc::now().timestamp(),
            content,
        })
    }

    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Message {
            role: Role::User,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant() -> Self {
        Message {
            role: Role::Assistant,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Add any MessageContent to the message
    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    /// Add image content to the message
    pub fn with_image<S: Into<String>, T: Into<String>>(self, data: S, mime_type: T) -> Self {
        self.with_content(MessageContent::image(data, mime_type))
    }

    /// Add a tool request to the message
    pub fn with_tool_request<S: Into<String>>(
        self,
        id: S,
        tool_call: AgentResult<ToolCall>,
    ) -> Self {
        self.with_content(MessageContent::tool_request(id, tool_call))
    }

    /// Add a tool response to the message
    pub fn with_tool_response<S: Into<String>>(
        self,
        id: S,
        result: AgentResult<Vec<Content>>,
    ) -> Self {
        self.with_content(MessageContent::tool_response(id, result))
    }

    /// Add a tool response that also records the files the tool wrote
    pub fn with_tool_output<S: Into<String>>(
        self,
        id: S,
        result: AgentResult<Vec<Content>>,
        artifacts: Vec<Artifact>,
    ) -> Self {
        self.with_content(MessageContent::ToolResponse(ToolResponse {
            id: id.into(),
            tool_result: result,
            artifacts,
        }))
    }

    /// All text parts of the message joined by newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The final text part. Inbound messages keep the user's own words there, after
    /// any parts holding uploaded file content.
    pub fn last_text(&self) -> Option<&str> {
        self.content.iter().rev().find_map(|c| c.as_text())
    }

    /// The first attached image, if any
    pub fn first_image(&self) -> Option<&ImageContent> {
        self.content.iter().find_map(|c| c.as_image())
    }

    pub fn has_image(&self) -> bool {
        self.first_image().is_some()
    }

    pub fn tool_requests(&self) -> Vec<&ToolRequest> {
        self.content
            .iter()
            .filter_map(|c| c.as_tool_request())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_rejects_empty_content() {
        let err = Message::new(Role::User, vec![]).unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(_)));

        let msg = Message::new(Role::User, vec![MessageContent::text("hi")]).unwrap();
        assert_eq!(msg.text(), "hi");
    }

    #[test]
    fn test_text_joins_only_text_parts() {
        let msg = Message::user()
            .with_text("first")
            .with_image("aGk=", "image/png")
            .with_text("second");
        assert_eq!(msg.text(), "first\nsecond");
        assert!(msg.has_image());
        assert_eq!(msg.first_image().unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_last_text() {
        let msg = Message::user()
            .with_text("file content")
            .with_text("the question")
            .with_image("aGk=", "image/png");
        assert_eq!(msg.last_text(), Some("the question"));
        assert_eq!(Message::user().last_text(), None);
    }

    #[test]
    fn test_tool_requests_preserve_order() {
        let msg = Message::assistant()
            .with_tool_request("a", Ok(ToolCall::new("one", json!({}))))
            .with_text("thinking")
            .with_tool_request("b", Ok(ToolCall::new("two", json!({}))));
        let ids: Vec<_> = msg.tool_requests().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_tool_response_text() {
        let content = MessageContent::tool_response(
            "1",
            Ok(vec![Content::text("line one"), Content::text("line two")]),
        );
        assert_eq!(
            content.as_tool_response_text(),
            Some("line one\nline two".to_string())
        );

        let failed = MessageContent::tool_response("2", Err(AgentError::ToolNotFound("x".into())));
        assert_eq!(failed.as_tool_response_text(), None);
    }
}
