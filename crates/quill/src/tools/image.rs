use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use super::{file_timestamp, output_path};
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::{Artifact, ArtifactKind, Tool, ToolCall, ToolOutput};
use crate::providers::base::ImageProvider;
use crate::toolbox::Toolbox;

/// Creates new images from a prompt, or edits an attached one
pub struct ImageToolbox {
    tools: Vec<Tool>,
    provider: Arc<dyn ImageProvider>,
    output_dir: PathBuf,
}

impl ImageToolbox {
    pub fn new(provider: Arc<dyn ImageProvider>, output_dir: impl Into<PathBuf>) -> Self {
        let generate_image = Tool::new(
            "generate_image",
            "Generates a new image from a text description, or modifies an existing image \
             when its base64 data is provided. Returns the path of the saved PNG file.",
            json!({
                "type": "object",
                "required": ["prompt"],
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Description of the image to create or the change to make"
                    },
                    "base64_image_data": {
                        "type": "string",
                        "description": "Optional base64 encoded image to modify"
                    }
                }
            }),
        );

        Self {
            tools: vec![generate_image],
            provider,
            output_dir: output_dir.into(),
        }
    }

    /// Generate an image and save it as PNG. Failures come back as `Error:` text.
    pub async fn generate(&self, prompt: &str, base64_image_data: Option<&str>) -> ToolOutput {
        match self.try_generate(prompt, base64_image_data).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(error = %e, "image generation failed");
                ToolOutput::text(format!(
                    "Error: An unexpected error occurred during image generation: {}",
                    e
                ))
            }
        }
    }

    async fn try_generate(
        &self,
        prompt: &str,
        base64_image_data: Option<&str>,
    ) -> anyhow::Result<ToolOutput> {
        tracing::info!(
            prompt = %prompt.chars().take(50).collect::<String>(),
            edit = base64_image_data.is_some(),
            "generating image"
        );

        let mut request = Message::user().with_text(prompt);
        if let Some(data) = base64_image_data.filter(|d| !d.is_empty()) {
            request = request.with_image(data, sniff_mime_type(data));
        }

        let (response, usage) = self.provider.generate_image(&[request]).await?;
        tracing::debug!(?usage, "image model responded");

        let Some(image) = response.first_image() else {
            return Ok(ToolOutput::text("Error: The model did not generate an image."));
        };

        let bytes = base64::prelude::BASE64_STANDARD.decode(image.data.as_bytes())?;
        let path = output_path(
            &self.output_dir,
            &format!("generated_image_{}.png", file_timestamp()),
        )?;
        tokio::fs::write(&path, bytes).await?;

        tracing::info!(path = %path.display(), "saved generated image");
        Ok(ToolOutput::text(format!(
            "Successfully generated image and saved it to the following path: {}",
            path.display()
        ))
        .with_artifact(Artifact::new(path, ArtifactKind::Image)))
    }
}

/// Guess the MIME type of base64 image data from its leading magic bytes
fn sniff_mime_type(data: &str) -> &'static str {
    if data.starts_with("iVBORw0KGgo") {
        "image/png"
    } else if data.starts_with("R0lGOD") {
        "image/gif"
    } else if data.starts_with("UklGR") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[async_trait]
impl Toolbox for ImageToolbox {
    fn name(&self) -> &str {
        "image"
    }

    fn description(&self) -> &str {
        "Generate and edit images"
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<ToolOutput> {
        match tool_call.name.as_str() {
            "generate_image" => {
                let prompt = tool_call
                    .arguments
                    .get("prompt")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        AgentError::InvalidParameters("The prompt parameter is required".into())
                    })?;
                let image = tool_call
                    .arguments
                    .get("base64_image_data")
                    .and_then(|v| v.as_str());
                Ok(self.generate(prompt, image).await)
            }
            _ => Err(AgentError::ToolNotFound(tool_call.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::MessageContent;
    use crate::providers::mock::MockProvider;

    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn image_reply() -> Message {
        Message::assistant()
            .with_text("Here you go")
            .with_image(PIXEL_PNG, "image/png")
    }

    #[tokio::test]
    async fn test_generate_saves_png() {
        let temp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![image_reply()]));
        let toolbox = ImageToolbox::new(provider.clone(), temp.path());

        let output = toolbox
            .call(ToolCall::new("generate_image", json!({"prompt": "a red fox"})))
            .await
            .unwrap();

        let text = output.as_text();
        assert!(text.starts_with("Successfully generated image and saved it to the following path: "));
        let artifact = &output.artifacts[0];
        assert_eq!(artifact.kind, ArtifactKind::Image);
        assert!(text.ends_with(&artifact.path.display().to_string()));

        let name = artifact.path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("generated_image_") && name.ends_with(".png"));

        let written = std::fs::read(&artifact.path).unwrap();
        assert_eq!(&written[..4], b"\x89PNG");

        let received = provider.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0][0].text(), "a red fox");
        assert!(!received[0][0].has_image());
    }

    #[tokio::test]
    async fn test_edit_sends_source_image() {
        let temp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![image_reply()]));
        let toolbox = ImageToolbox::new(provider.clone(), temp.path());

        toolbox.generate("make it blue", Some(PIXEL_PNG)).await;

        let request = &provider.received()[0][0];
        assert!(matches!(request.content[0], MessageContent::Text(_)));
        let image = request.first_image().unwrap();
        assert_eq!(image.data, PIXEL_PNG);
        assert_eq!(image.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_no_image_in_response() {
        let temp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("I can't draw that")
        ]));
        let toolbox = ImageToolbox::new(provider, temp.path());

        let output = toolbox.generate("something", None).await;
        assert_eq!(output.as_text(), "Error: The model did not generate an image.");
        assert!(output.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_image_is_unexpected_error() {
        let temp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_image("not base64!!", "image/png")
        ]));
        let toolbox = ImageToolbox::new(provider, temp.path());

        let output = toolbox.generate("something", None).await;
        assert!(output
            .as_text()
            .starts_with("Error: An unexpected error occurred during image generation: "));
    }

    #[test]
    fn test_sniff_mime_type() {
        assert_eq!(sniff_mime_type(PIXEL_PNG), "image/png");
        assert_eq!(sniff_mime_type("/9j/4AAQSkZJRg"), "image/jpeg");
        assert_eq!(sniff_mime_type("R0lGODlhAQABAAAAACw="), "image/gif");
    }
}
