//! Speech capture and playback controllers
//!
//! This module provides:
//! - Speech input: a two-state wrapper over the platform recognizer
//! - Speech output: one cancellable utterance at a time
//! - The platform seam traits both controllers are built against

pub mod input;
pub mod output;
pub mod platform;

pub use input::{InputState, SpeechInput, SpeechInputEvent};
pub use output::SpeechOutput;
pub use platform::{CommandSynthesizer, RecognizerEvent, SpeechRecognizer, SpeechSynthesizer};
