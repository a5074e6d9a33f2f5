//! Failure classification into a stable, user-facing taxonomy
//!
//! Every remote failure is funneled through [`classify`] before it is shown
//! to the user, so the conversation log only ever carries one of a fixed set
//! of explanations.

/// User-facing failure taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The machine has no connectivity at all
    Offline,

    /// Invalid credential or missing permission
    Auth,

    /// Usage quota or rate limit exhausted
    Quota,

    /// Upstream 5xx-class failure
    Service,

    /// Transport/fetch-level failure
    Network,

    /// No usable credential at startup
    Configuration,

    /// Fallback, carries the original message for display
    Unknown(String),
}

/// Apology prefix for general turn failures
pub const TURN_APOLOGY: &str = "Sorry, something went wrong.";

/// Apology prefix for image-generation failures
pub const IMAGE_APOLOGY: &str = "Sorry, I couldn't generate that image.";

const AUTH_PHRASES: &[&str] = &[
    "api key",
    "credential",
    "permission",
    "unauthorized",
    "authentication",
];

const QUOTA_PHRASES: &[&str] = &["quota", "rate limit", "resource exhausted", "429"];

const SERVICE_PHRASES: &[&str] = &["500", "502", "503", "504", "529", "server error"];

const NETWORK_PHRASES: &[&str] = &["network", "fetch", "connection"];

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| haystack.contains(phrase))
}

/// Classify a raw failure message under a connectivity signal.
///
/// Deterministic and total: not-online short-circuits to [`ErrorKind::Offline`]
/// regardless of message content; otherwise phrase predicates are checked in
/// fixed priority order over the lower-cased message.
pub fn classify(message: &str, online: bool) -> ErrorKind {
    if !online {
        return ErrorKind::Offline;
    }

    let lowered = message.to_lowercase();

    if contains_any(&lowered, AUTH_PHRASES) {
        ErrorKind::Auth
    } else if contains_any(&lowered, QUOTA_PHRASES) {
        ErrorKind::Quota
    } else if contains_any(&lowered, SERVICE_PHRASES) {
        ErrorKind::Service
    } else if contains_any(&lowered, NETWORK_PHRASES) {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown(message.to_string())
    }
}

impl ErrorKind {
    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            ErrorKind::Offline => {
                "You appear to be offline. Please check your connection.".to_string()
            }
            ErrorKind::Auth => {
                "The API key is invalid or lacks permission. Please check your credentials."
                    .to_string()
            }
            ErrorKind::Quota => {
                "The usage quota has been exceeded. Please try again later.".to_string()
            }
            ErrorKind::Service => {
                "The AI service ran into an internal error. Please try again.".to_string()
            }
            ErrorKind::Network => {
                "A network error interrupted the request. Please try again.".to_string()
            }
            ErrorKind::Configuration => {
                "No API key is configured, so messages cannot be sent.".to_string()
            }
            ErrorKind::Unknown(message) => message.clone(),
        }
    }
}
