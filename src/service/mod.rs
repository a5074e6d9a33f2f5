//! Remote AI service boundary
//!
//! The conversational and image-generation services are collaborators
//! specified only at this seam: async traits the orchestrator awaits, plus
//! the Gemini HTTP adapters that implement them. Failures cross the seam as
//! plain message strings shaped for the classifier in [`crate::error`].

pub mod chat;
pub mod image;

pub use chat::GeminiChat;
pub use image::GeminiImage;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// A failed remote call, carrying the message text the classifier inspects
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceFailure {
    pub message: String,
}

impl ServiceFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One generated image: binary payload plus its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl ImageBytes {
    /// Encode as a data URI for the rendering boundary
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.data))
    }
}

/// The conversational AI service: one turn in, one raw reply out
#[async_trait]
pub trait ChatService: Send {
    async fn send_turn(&mut self, text: &str) -> std::result::Result<String, ServiceFailure>;
}

/// The image generation service
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate(&self, prompt: &str) -> std::result::Result<ImageBytes, ServiceFailure>;
}

/// Map an HTTP error response to a failure message the classifier's phrase
/// predicates recognize.
pub(crate) fn map_http_failure(status: reqwest::StatusCode, body: &str) -> ServiceFailure {
    let detail = extract_error_message(body);

    let message = match status.as_u16() {
        401 | 403 => format!("API key not valid or permission denied: {detail}"),
        429 => format!("quota exceeded (rate limit): {detail}"),
        s if s >= 500 => format!("server error (HTTP {s}): {detail}"),
        s => format!("request failed (HTTP {s}): {detail}"),
    };

    ServiceFailure::new(message)
}

/// Pull a human-readable message out of a Google-style error body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body.chars().take(300).collect()
            }
        })
}
