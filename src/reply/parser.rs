//! Reply segmentation into renderable parts
//!
//! Splits a raw assistant reply into ordered text and fenced-code segments.
//! The fence contract is the literal triple-backtick convention: an opening
//! marker with an optional language tag and a line break, the code interior,
//! and a closing marker.

use crate::messages::MessagePart;
use regex::Regex;
use std::sync::OnceLock;

/// Language assigned to a fence with an empty tag
pub const DEFAULT_LANGUAGE: &str = "plaintext";

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        // Non-greedy interior keeps matches left-to-right and non-overlapping.
        // An opening marker with no matching close does not match at all and
        // falls through as plain text.
        Regex::new(r"```(\w*)\n([\s\S]*?)```").unwrap_or_else(|e| {
            unreachable!("fence pattern is a constant and always compiles: {e}")
        })
    })
}

/// Parse a raw reply into an ordered, non-empty list of message parts.
///
/// Total for all inputs: a reply with no fenced regions yields a single
/// verbatim text part, even when blank. Whitespace-only text lying between
/// fenced regions is dropped; code interiors are trimmed and the language
/// tag is lower-cased, defaulting to `"plaintext"` when empty.
pub fn parse_reply(reply: &str) -> Vec<MessagePart> {
    let mut parts = Vec::new();
    let mut cursor = 0;

    for caps in fence_regex().captures_iter(reply) {
        let Some(whole) = caps.get(0) else { continue };

        let before = &reply[cursor..whole.start()];
        if !before.trim().is_empty() {
            parts.push(MessagePart::text(before));
        }

        let tag = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let language = if tag.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            tag.to_lowercase()
        };
        let content = caps.get(2).map(|m| m.as_str()).unwrap_or("").trim();
        parts.push(MessagePart::code(content, language));

        cursor = whole.end();
    }

    if parts.is_empty() {
        // No fenced region anywhere: the whole input verbatim, blank or not,
        // so the result is never empty.
        return vec![MessagePart::text(reply)];
    }

    let trailing = &reply[cursor..];
    if !trailing.trim().is_empty() {
        parts.push(MessagePart::text(trailing));
    }

    parts
}
