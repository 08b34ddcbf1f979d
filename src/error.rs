//! Error taxonomy for a voice session
//!
//! Every variant is recovered at the boundary where it occurs. The controller
//! turns it into a short status line (and, for processing failures, an
//! apology in the conversation log) and keeps the microphone usable.

use thiserror::Error;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while capturing, submitting or presenting an exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("No audio was captured")]
    EmptyCapture,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Server returned HTTP {0}")]
    ServerError(u16),

    #[error("Live room negotiation failed: {0}")]
    NegotiationFailed(String),

    #[error("Live connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Audio playback error: {0}")]
    PlaybackError(String),
}

impl SessionError {
    /// Human readable status line shown to the user for this failure
    pub fn status_text(&self) -> &'static str {
        match self {
            SessionError::PermissionDenied(_) => "Microphone access denied",
            SessionError::DeviceUnavailable(_) => "Error accessing microphone",
            SessionError::EmptyCapture => crate::presentation::STATUS_READY,
            SessionError::NetworkError(_) | SessionError::ServerError(_) => {
                "Error - Ready to try again"
            }
            SessionError::NegotiationFailed(_) | SessionError::ConnectionFailed(_) => {
                "Live avatar unavailable, using audio"
            }
            SessionError::PlaybackError(_) => crate::presentation::STATUS_READY,
        }
    }

    /// Whether the failure happened while processing an exchange (and so
    /// deserves an apology in the conversation)
    pub fn is_processing_failure(&self) -> bool {
        matches!(
            self,
            SessionError::NetworkError(_) | SessionError::ServerError(_)
        )
    }
}

impl From<hound::Error> for SessionError {
    fn from(err: hound::Error) -> Self {
        SessionError::DeviceUnavailable(err.to_string())
    }
}
