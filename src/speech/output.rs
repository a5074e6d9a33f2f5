//! Speech output controller
//!
//! Speaks at most one utterance at a time. New assistant messages preempt
//! whatever is in flight; disabling, a new user submission, or starting
//! capture cancels unconditionally. Enabling never speaks history
//! retroactively, only assistant turns appended afterwards.

use super::platform::SpeechSynthesizer;
use crate::messages::Message;
use tracing::{debug, warn};

pub struct SpeechOutput {
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    enabled: bool,
}

impl SpeechOutput {
    /// Starts disabled; `None` means the platform has no synthesizer and
    /// every call is a silent no-op.
    pub fn new(synthesizer: Option<Box<dyn SpeechSynthesizer>>) -> Self {
        Self {
            synthesizer,
            enabled: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turning the flag off cancels in-flight speech; turning it on affects
    /// only future assistant turns.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            self.cancel();
        }
        self.enabled = enabled;
        debug!(enabled, "Speech output toggled");
    }

    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    /// Observation rule for a freshly appended assistant message: join its
    /// text parts with single spaces (code and image parts are skipped) and,
    /// if the result is non-blank, preempt any current utterance with it.
    pub fn on_assistant_message(&self, message: &Message) {
        if !self.enabled {
            return;
        }
        let Some(synthesizer) = self.synthesizer.as_ref() else {
            return;
        };

        let text = message.spoken_text();
        if text.trim().is_empty() {
            return;
        }

        synthesizer.cancel();
        if let Err(e) = synthesizer.speak(&text) {
            // Speech failure never disturbs the conversation
            warn!("Utterance failed: {}", e);
        }
    }

    /// Cancel the in-flight utterance, if any
    pub fn cancel(&self) {
        if let Some(synthesizer) = self.synthesizer.as_ref() {
            synthesizer.cancel();
        }
    }
}
