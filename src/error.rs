//! Error types for the live voice pipeline.

use crate::state_machine::LiveState;

/// Errors surfaced by the audio pipeline and its remote channel.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// Microphone or speaker could not be opened (absent device, permission denied).
    #[error("audio device unavailable: {0}")]
    Acquisition(String),

    /// The remote session failed or could not be established.
    #[error("transport error: {0}")]
    Transport(String),

    /// An inbound audio payload was not valid base64 PCM.
    #[error("audio decode error: {0}")]
    Decode(String),

    /// One-shot text-to-speech request failed.
    #[error("speech request failed: {0}")]
    Speech(String),

    #[error("API key not set; export {0}")]
    MissingApiKey(&'static str),

    #[error("voice mode is {0}, not idle")]
    Busy(LiveState),
}

impl LiveError {
    /// Message shown to the user when voice mode cannot start.
    pub fn user_message(&self) -> String {
        match self {
            LiveError::Acquisition(_) => {
                "Failed to start Live mode. Please ensure microphone permissions are allowed."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, LiveError>;
