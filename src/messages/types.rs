use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

/// One renderable segment of a message.
///
/// Exactly one shape is valid per instance; the rendering boundary must
/// handle all three exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessagePart {
    Text {
        content: String,
    },
    Code {
        content: String,
        language: String,
    },
    Image {
        /// Binary payload encoded as a data URI
        data_uri: String,
        /// Original directive text, retained for attribution/accessibility
        prompt: String,
    },
}

impl MessagePart {
    pub fn text(content: impl Into<String>) -> Self {
        MessagePart::Text {
            content: content.into(),
        }
    }

    pub fn code(content: impl Into<String>, language: impl Into<String>) -> Self {
        MessagePart::Code {
            content: content.into(),
            language: language.into(),
        }
    }

    pub fn image(data_uri: impl Into<String>, prompt: impl Into<String>) -> Self {
        MessagePart::Image {
            data_uri: data_uri.into(),
            prompt: prompt.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, MessagePart::Text { .. })
    }

    pub fn is_code(&self) -> bool {
        matches!(self, MessagePart::Code { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, MessagePart::Image { .. })
    }
}

/// An immutable conversation message with ordered parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub parts: Vec<MessagePart>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message. `parts` must be non-empty.
    pub fn new(role: Role, parts: Vec<MessagePart>) -> Self {
        debug_assert!(!parts.is_empty(), "a message must have at least one part");
        Self {
            id: Uuid::new_v4(),
            role,
            parts,
            timestamp: Utc::now(),
        }
    }

    /// Create a user message with a single text part
    pub fn user_text(content: impl Into<String>) -> Self {
        Self::new(Role::User, vec![MessagePart::text(content)])
    }

    /// Create an assistant message with a single text part
    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![MessagePart::text(content)])
    }

    /// Concatenate the content of all text parts, separated by single spaces.
    ///
    /// Code and image parts are skipped. This is the text handed to speech
    /// output for assistant messages.
    pub fn spoken_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { content } => Some(content.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
