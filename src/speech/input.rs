//! Speech input controller
//!
//! Two-state machine over a platform recognizer. The controller streams
//! interim transcripts while listening and reconciles the platform's
//! autonomous end-of-capture signal (silence timeout, echoed stop, or
//! recognition error) back to idle. Recognition errors are logged, never
//! surfaced as a user-facing failure.

use super::platform::{RecognizerEvent, SpeechRecognizer};
use crate::Result;
use crossbeam_channel::TryRecvError;
use tracing::{debug, warn};

/// Capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputState {
    #[default]
    Idle,
    Listening,
}

/// Observable outcome of polling the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechInputEvent {
    /// The draft input should be replaced with this transcript
    TranscriptChanged(String),

    /// Capture ended and the controller is idle again
    Stopped,
}

/// Wraps the platform recognizer with an Idle/Listening state machine.
///
/// Constructed with `None` on platforms without recognition support, in
/// which case the affordance is permanently absent rather than failing at
/// call time.
pub struct SpeechInput {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    state: InputState,
}

impl SpeechInput {
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>) -> Self {
        Self {
            recognizer,
            state: InputState::Idle,
        }
    }

    /// Controller for a platform without speech recognition
    pub fn unavailable() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.state == InputState::Listening
    }

    /// Begin capture. Valid only from idle; a redundant call is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.state == InputState::Listening {
            debug!("start() while already listening ignored");
            return Ok(());
        }

        let Some(recognizer) = self.recognizer.as_mut() else {
            debug!("Speech input unavailable on this platform");
            return Ok(());
        };

        recognizer.start()?;
        self.state = InputState::Listening;
        debug!("Listening started");
        Ok(())
    }

    /// Request capture to end. The transition back to idle happens when the
    /// platform echoes the stop through its event stream.
    pub fn stop(&mut self) {
        if self.state != InputState::Listening {
            return;
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
    }

    /// Drain pending recognizer events, reconciling state transitions.
    ///
    /// Each result event replaces (never appends to) the transcript with the
    /// concatenation of all currently recognized best transcripts, in event
    /// order.
    pub fn poll(&mut self) -> Vec<SpeechInputEvent> {
        let Some(recognizer) = self.recognizer.as_ref() else {
            return Vec::new();
        };

        let receiver = recognizer.events();
        let mut events = Vec::new();

        loop {
            match receiver.try_recv() {
                Ok(RecognizerEvent::Results(transcripts)) => {
                    if self.state == InputState::Listening {
                        events.push(SpeechInputEvent::TranscriptChanged(transcripts.concat()));
                    }
                }
                Ok(RecognizerEvent::Error(message)) => {
                    // Logged only; ends listening same as a clean stop
                    warn!("Recognition error: {}", message);
                    if self.state == InputState::Listening {
                        self.state = InputState::Idle;
                        events.push(SpeechInputEvent::Stopped);
                    }
                }
                Ok(RecognizerEvent::End) => {
                    if self.state == InputState::Listening {
                        self.state = InputState::Idle;
                        events.push(SpeechInputEvent::Stopped);
                        debug!("Listening ended");
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.state == InputState::Listening {
                        self.state = InputState::Idle;
                        events.push(SpeechInputEvent::Stopped);
                    }
                    break;
                }
            }
        }

        events
    }
}
