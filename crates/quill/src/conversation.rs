use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::Artifact;

/// The message history threaded through one workflow invocation.
///
/// Append-only: messages can be added and read, never replaced or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation from the inbound user message
    pub fn from_message(message: Message) -> Self {
        Self {
            messages: vec![message],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend<I: IntoIterator<Item = Message>>(&mut self, messages: I) {
        self.messages.extend(messages);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the last assistant message, which is the workflow's final answer
    pub fn final_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.text().trim().to_string())
    }

    /// Every file written by a tool during this conversation, oldest first
    pub fn artifacts(&self) -> Vec<&Artifact> {
        self.messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(MessageContent::as_tool_response)
            .flat_map(|r| r.artifacts.iter())
            .collect()
    }
}
