//! Gemini chat adapter
//!
//! One session per process: created at startup with a fixed system
//! instruction and model id, keeping the turn history client-side. A failed
//! turn leaves the history exactly as it was before the call.

use super::{map_http_failure, ChatService, ServiceFailure};
use crate::config::AssistantConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info};

pub struct GeminiChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    system_instruction: String,
    /// Alternating user/model turns in wire format
    history: Vec<Value>,
}

impl GeminiChat {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.chat_model.clone(),
            system_instruction: config.system_instruction.clone(),
            history: Vec::new(),
        }
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    fn turn(role: &str, text: &str) -> Value {
        json!({ "role": role, "parts": [{ "text": text }] })
    }

    fn request_body(&self) -> Value {
        json!({
            "contents": self.history,
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
        })
    }

    /// Join the text of every part of the first candidate. An empty reply is
    /// not a failure here; the reply parser is total over blank input.
    fn extract_reply(body: &Value) -> String {
        body.pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatService for GeminiChat {
    async fn send_turn(&mut self, text: &str) -> Result<String, ServiceFailure> {
        self.history.push(Self::turn("user", text));

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!(model = %self.model, turns = self.history.len(), "Sending chat turn");

        let result = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body())
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.history.pop();
                error!("Chat transport failure: {}", e);
                return Err(ServiceFailure::new(format!("network error: {e}")));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            self.history.pop();
            error!(status = %status, "Chat turn rejected");
            return Err(map_http_failure(status, &body));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                self.history.pop();
                return Err(ServiceFailure::new(format!("network error reading reply: {e}")));
            }
        };

        let reply = Self::extract_reply(&body);
        self.history.push(Self::turn("model", &reply));
        info!(chars = reply.len(), "Chat turn complete");
        Ok(reply)
    }
}
