pub const GOOGLE_HOST: &str = "https://generativelanguage.googleapis.com";
pub const GOOGLE_MODEL: &str = "gemini-2.0-flash";
pub const GOOGLE_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

#[derive(Clone)]
pub struct GoogleProviderConfig {
    pub host: String,
    pub api_key: String,
    /// Model used for reasoning and tool calling
    pub model: String,
    /// Model used for image generation and editing
    pub image_model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl GoogleProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            host: GOOGLE_HOST.to_string(),
            api_key: api_key.into(),
            model: GOOGLE_MODEL.to_string(),
            image_model: GOOGLE_IMAGE_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

// The api key stays out of logs
impl std::fmt::Debug for GoogleProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProviderConfig")
            .field("host", &self.host)
            .field("model", &self.model)
            .field("image_model", &self.image_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}
