use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::{Message, ToolRequest};
use crate::prompt_template;
use crate::providers::base::Provider;
use crate::registry::ToolRegistry;

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// How many rounds of tool execution a single reply may run
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

/// Agent integrates a foundational LLM with the tools it can call
pub struct Agent {
    provider: Arc<dyn Provider>,
    registry: ToolRegistry,
    config: AgentConfig,
    system_prompt: String,
}

impl Agent {
    /// Create a new Agent, rendering the system prompt for the registered tools
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: ToolRegistry,
        config: AgentConfig,
    ) -> AgentResult<Self> {
        let system_prompt = prompt_template::system_prompt(registry.tools())
            .map_err(|e| AgentError::Internal(format!("failed to render system prompt: {}", e)))?;

        Ok(Self {
            provider,
            registry,
            config,
            system_prompt,
        })
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Create a stream that yields each message as it's generated by the agent.
    ///
    /// Every model turn is yielded, followed by one user message holding the tool
    /// responses whenever the turn requested tools. The stream ends after the first
    /// turn without tool requests, or with `RoundLimitExceeded` when the model keeps
    /// asking for tools.
    pub fn reply(&self, messages: &[Message]) -> BoxStream<'_, AgentResult<Message>> {
        let mut messages = messages.to_vec();
        let tools = self.registry.tools().to_vec();
        let max_rounds = self.config.max_tool_rounds;

        Box::pin(async_stream::try_stream! {
            let mut rounds = 0;
            loop {
                let (response, usage) = self
                    .provider
                    .complete(&self.system_prompt, &messages, &tools)
                    .await
                    .map_err(AgentError::from)?;
                tracing::debug!(?usage, "model turn complete");

                yield response.clone();

                tokio::task::yield_now().await;

                let tool_requests: Vec<&ToolRequest> = response.tool_requests();
                if tool_requests.is_empty() {
                    break;
                }

                if rounds >= max_rounds {
                    tracing::warn!(max_rounds, "model kept requesting tools");
                    Err::<(), _>(AgentError::RoundLimitExceeded(max_rounds))?;
                }
                rounds += 1;

                // Tools run one at a time, in the order the model listed them
                let mut message_tool_response = Message::user();
                for request in &tool_requests {
                    let output = self.registry.dispatch(request.tool_call.clone()).await;
                    message_tool_response = match output {
                        Ok(output) => message_tool_response.with_tool_output(
                            request.id.clone(),
                            Ok(output.content),
                            output.artifacts,
                        ),
                        Err(e) => {
                            tracing::warn!(id = %request.id, error = %e, "tool call failed");
                            message_tool_response.with_tool_response(request.id.clone(), Err(e))
                        }
                    };
                }

                yield message_tool_response.clone();

                messages.push(response);
                messages.push(message_tool_response);
            }
        })
    }
}
