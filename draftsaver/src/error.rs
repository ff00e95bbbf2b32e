use thiserror::Error;

use crate::validate::FieldError;

/// Result type for draftsaver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up or driving a saver.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Attachment was refused before it reached the form
    #[error("Attachment rejected: {0}")]
    Attachment(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a local file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A global tracing subscriber was already installed
    #[error("Failed to initialize telemetry: {0}")]
    Telemetry(#[from] tracing_subscriber::util::TryInitError),
}

/// Why a save attempt did not persist the draft.
///
/// Every variant is reported once through the saver's report channel and is
/// never fatal to the editing session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SaveError {
    /// The request never reached the server or no response came back
    #[error("Network failure: {message}")]
    NetworkFailure { message: String },

    /// The server answered but declined the save
    #[error("Save rejected ({}): {reason}", .status.map(|s| s.to_string()).unwrap_or_else(|| "no status".to_string()))]
    Rejected { status: Option<u16>, reason: String },

    /// Client-side checks failed on an explicit submit; nothing was sent
    #[error("Form is incomplete: {} field(s) invalid", .0.len())]
    Invalid(Vec<FieldError>),
}

impl SaveError {
    /// Short message suitable for a transient notification banner.
    pub fn user_message(&self) -> String {
        match self {
            SaveError::NetworkFailure { .. } => "Could not reach the server, your draft was not saved".to_string(),
            SaveError::Rejected { reason, .. } if !reason.is_empty() => reason.clone(),
            SaveError::Rejected { .. } => "The server refused to save this draft".to_string(),
            SaveError::Invalid(_) => "Please fill in all required fields".to_string(),
        }
    }
}
