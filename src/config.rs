//! Assistant configuration
//!
//! Centralized configuration for the services and the orchestrator.

/// Environment variable holding the API credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. When the user asks you to \
generate, draw, or create an image, respond with only a JSON object of the form \
{\"image_prompt\": \"<detailed prompt>\"} and nothing else. For everything else, answer \
normally, using fenced code blocks for code.";

/// Configuration for the complete assistant
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// API credential; empty means the session cannot be created
    pub api_key: String,

    /// Base URL of the generative AI service
    pub base_url: String,

    /// Model id for conversational turns
    pub chat_model: String,

    /// Model id for image generation
    pub image_model: String,

    /// Fixed system instruction installed at session creation
    pub system_instruction: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl AssistantConfig {
    /// Read the credential from the environment; everything else defaulted
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        Self {
            api_key,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err(format!("API key is required (set {API_KEY_ENV})"));
        }
        if self.base_url.trim().is_empty() {
            return Err("Base URL is required".to_string());
        }
        if self.chat_model.trim().is_empty() {
            return Err("Chat model id is required".to_string());
        }
        Ok(())
    }
}
