use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{ImageProvider, Provider, Usage};
use super::configs::GoogleProviderConfig;
use super::utils::{google_response_to_message, messages_to_google_spec, tools_to_google_spec};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub struct GoogleProvider {
    client: Client,
    config: GoogleProviderConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = &data["usageMetadata"];
        let read = |key: &str| usage.get(key).and_then(|v| v.as_i64()).map(|v| v as i32);

        let input_tokens = read("promptTokenCount");
        let output_tokens = read("candidatesTokenCount");
        let total_tokens = read("totalTokenCount").or(match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    async fn post(&self, model: &str, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.host.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow!("Request failed: {}\nResponse: {}", status, body))
            }
        }
    }

    fn generation_config(&self) -> Value {
        let mut config = json!({});
        if let Some(temp) = self.config.temperature {
            config["temperature"] = json!(temp);
        }
        if let Some(tokens) = self.config.max_tokens {
            config["maxOutputTokens"] = json!(tokens);
        }
        config
    }

    fn parse(response: Value) -> Result<(Message, Usage)> {
        if let Some(error) = response.get("error") {
            return Err(anyhow!("Google API error: {}", error));
        }

        let usage = Self::get_usage(&response);
        let message = google_response_to_message(response)?;
        Ok((message, usage))
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let mut payload = json!({
            "contents": messages_to_google_spec(messages),
        });
        if !system.is_empty() {
            payload["systemInstruction"] = json!({"parts": [{"text": system}]});
        }

        let tools_spec = tools_to_google_spec(tools)?;
        if !tools_spec.is_empty() {
            payload["tools"] = json!(tools_spec);
        }
        let generation_config = self.generation_config();
        if generation_config.as_object().is_some_and(|c| !c.is_empty()) {
            payload["generationConfig"] = generation_config;
        }

        tracing::debug!(model = %self.config.model, messages = messages.len(), "requesting completion");
        let response = self.post(&self.config.model, payload).await?;
        Self::parse(response)
    }
}

#[async_trait]
impl ImageProvider for GoogleProvider {
    async fn generate_image(&self, messages: &[Message]) -> Result<(Message, Usage)> {
        let mut generation_config = self.generation_config();
        generation_config["responseModalities"] = json!(["TEXT", "IMAGE"]);

        let payload = json!({
            "contents": messages_to_google_spec(messages),
            "generationConfig": generation_config,
        });

        tracing::debug!(model = %self.config.image_model, "requesting image generation");
        let response = self.post(&self.config.image_model, payload).await?;
        Self::parse(response)
    }
}
