//! Gemini image generation adapter
//!
//! Requests a single image for a directive prompt. A reply without inline
//! image data is a failure like any other, with the literal message
//! `"no image data received"`.

use super::{map_http_failure, ImageBytes, ImageService, ServiceFailure};
use crate::config::AssistantConfig;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, error, info};

pub struct GeminiImage {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiImage {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.image_model.clone(),
        }
    }

    fn request_body(prompt: &str) -> Value {
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        })
    }

    /// Find the first inline image payload among the candidate's parts
    fn extract_image(body: &Value) -> Result<ImageBytes, ServiceFailure> {
        let inline = body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .and_then(|parts| {
                parts
                    .iter()
                    .find_map(|part| part.get("inlineData").or_else(|| part.get("inline_data")))
            })
            .ok_or_else(|| ServiceFailure::new("no image data received"))?;

        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png")
            .to_string();

        let encoded = inline
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceFailure::new("no image data received"))?;

        let data = BASE64
            .decode(encoded)
            .map_err(|e| ServiceFailure::new(format!("image payload not decodable: {e}")))?;

        Ok(ImageBytes { data, mime_type })
    }
}

#[async_trait]
impl ImageService for GeminiImage {
    async fn generate(&self, prompt: &str) -> Result<ImageBytes, ServiceFailure> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!(model = %self.model, "Requesting image generation");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                error!("Image transport failure: {}", e);
                ServiceFailure::new(format!("network error: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Image generation rejected");
            return Err(map_http_failure(status, &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceFailure::new(format!("network error reading reply: {e}")))?;

        let image = Self::extract_image(&body)?;
        info!(bytes = image.data.len(), mime = %image.mime_type, "Image received");
        Ok(image)
    }
}
