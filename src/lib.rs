pub mod config;
pub mod error;
pub mod messages;
pub mod orchestrator;
pub mod preview;
pub mod reply;
pub mod sandbox;
pub mod service;
pub mod speech;

use thiserror::Error;

/// Local fault surface for the platform-facing pieces (speech synthesis,
/// preview files). Remote service failures travel separately as
/// [`service::ServiceFailure`] so the classifier in [`error`] can shape
/// them for the conversation log.
#[derive(Error, Debug, Clone)]
pub enum ConfabError {
    #[error("Speech output error: {0}")]
    SpeechOutputError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for ConfabError {
    fn from(e: std::io::Error) -> Self {
        ConfabError::IOError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfabError>;
