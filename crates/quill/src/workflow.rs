//! One pass through the request graph: route the inbound message, then run either
//! the tool-calling agent or the image node, collecting everything into a
//! [`Conversation`].

use futures::TryStreamExt;
use serde_json::json;
use std::sync::Arc;

use crate::agent::Agent;
use crate::conversation::Conversation;
use crate::errors::AgentResult;
use crate::models::message::Message;
use crate::models::tool::ToolCall;
use crate::router::{route_message, Route};
use crate::tools::image::ImageToolbox;

/// Prompt used when an image arrives with no instructions
pub const DEFAULT_IMAGE_PROMPT: &str = "Create a new variation of this image.";

pub struct Workflow {
    agent: Agent,
    image: Arc<ImageToolbox>,
}

impl Workflow {
    pub fn new(agent: Agent, image: Arc<ImageToolbox>) -> Self {
        Self { agent, image }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Handle one inbound user message and return the full exchange
    pub async fn invoke(&self, message: Message) -> AgentResult<Conversation> {
        let route = route_message(&message);
        tracing::info!(%route, "routing request");

        let mut conversation = Conversation::from_message(message);
        match route {
            Route::Image => self.run_image(&mut conversation).await,
            Route::Agent => self.run_agent(&mut conversation).await?,
        }
        Ok(conversation)
    }

    async fn run_agent(&self, conversation: &mut Conversation) -> AgentResult<()> {
        let mut stream = self.agent.reply(conversation.messages());
        let mut produced = Vec::new();
        while let Some(message) = stream.try_next().await? {
            produced.push(message);
        }
        drop(stream);
        conversation.extend(produced);
        Ok(())
    }

    /// Generate straight from the user's words, recording the call as a regular
    /// tool round so its artifact travels with the conversation
    async fn run_image(&self, conversation: &mut Conversation) {
        let Some(request) = conversation.last().cloned() else {
            return;
        };

        let prompt = match request.last_text().unwrap_or_default().trim() {
            "" => DEFAULT_IMAGE_PROMPT,
            trimmed => trimmed,
        };
        let source = request.first_image().map(|image| image.data.as_str());

        let mut arguments = json!({ "prompt": prompt });
        if let Some(data) = source {
            arguments["base64_image_data"] = json!(data);
        }
        let id = uuid::Uuid::new_v4().to_string();
        let output = self.image.generate(prompt, source).await;
        let result_text = output.as_text();

        conversation.push(
            Message::assistant()
                .with_tool_request(id.clone(), Ok(ToolCall::new("generate_image", arguments))),
        );
        conversation.push(Message::user().with_tool_output(
            id,
            Ok(output.content),
            output.artifacts,
        ));
        conversation.push(Message::assistant().with_text(result_text));
    }
}
