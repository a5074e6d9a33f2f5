//! Platform speech engine seams
//!
//! The recognizer and synthesizer are external engines this crate consumes,
//! never implements. Each sits behind an owned trait object so the
//! controllers stay testable with a substitute, instead of reaching for an
//! ambient global the way browser speech APIs are exposed.

use crate::{ConfabError, Result};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

/// Event emitted by a platform recognizer during capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    /// The full set of currently recognized results, best transcript each.
    /// Later events supersede earlier ones for the same capture session.
    Results(Vec<String>),

    /// Platform-side recognition error; ends the capture
    Error(String),

    /// Capture ended (silence timeout, explicit stop echoed back)
    End,
}

/// A platform speech-recognition engine
pub trait SpeechRecognizer: Send {
    /// Begin capturing audio
    fn start(&mut self) -> Result<()>;

    /// Request the platform to end capture; completion is signalled through
    /// a later [`RecognizerEvent::End`]
    fn stop(&mut self);

    /// Event stream for the current capture session
    fn events(&self) -> Receiver<RecognizerEvent>;
}

/// A platform speech-synthesis engine
pub trait SpeechSynthesizer: Send {
    /// Begin speaking one utterance
    fn speak(&self, text: &str) -> Result<()>;

    /// Cancel the in-flight utterance, if any
    fn cancel(&self);
}

/// Synthesizer backed by the system speech command (`say` on macOS,
/// `espeak` elsewhere). One utterance at a time; starting a new one or
/// cancelling kills the running process.
pub struct CommandSynthesizer {
    program: PathBuf,
    child: Mutex<Option<Child>>,
}

impl CommandSynthesizer {
    /// Locate a system speech command, if the platform has one
    pub fn discover() -> Option<Self> {
        let candidates: &[&str] = if cfg!(target_os = "macos") {
            &["say"]
        } else {
            &["espeak-ng", "espeak"]
        };

        let program = candidates
            .iter()
            .find_map(|name| which::which(name).ok())?;
        debug!(program = %program.display(), "Speech synthesizer found");

        Some(Self {
            program,
            child: Mutex::new(None),
        })
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&self, text: &str) -> Result<()> {
        self.cancel();

        let child = Command::new(&self.program)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ConfabError::SpeechOutputError(format!("failed to speak: {e}")))?;

        *self.child.lock() = Some(child);
        Ok(())
    }

    fn cancel(&self) {
        if let Some(mut child) = self.child.lock().take() {
            if let Err(e) = child.kill() {
                warn!("Failed to cancel utterance: {}", e);
            }
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}
