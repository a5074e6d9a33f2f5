//! Directive detection for structured replies
//!
//! A reply whose entire trimmed text is a JSON object carrying a string
//! `image_prompt` field is an image-generation directive and never reaches
//! text/code segmentation. Anything else, including replies that merely
//! mention `image_prompt` inside prose, is ordinary conversation.

use serde_json::Value;

/// Classification of a raw assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    /// The reply is, in its entirety, an image-generation request
    ImageDirective(String),

    /// The reply is ordinary prose/code content
    NotADirective,
}

/// Classify a raw reply. Total for all input strings.
///
/// The parse attempt is a non-throwing outcome inspected structurally; a
/// failed parse or a successful parse lacking the exact shape both classify
/// as [`ReplyKind::NotADirective`].
pub fn classify_reply(reply: &str) -> ReplyKind {
    let trimmed = reply.trim();

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return ReplyKind::NotADirective;
    };

    match value.get("image_prompt").and_then(Value::as_str) {
        Some(prompt) => ReplyKind::ImageDirective(prompt.to_string()),
        None => ReplyKind::NotADirective,
    }
}
