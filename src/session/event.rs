use crate::error::SessionError;
use crate::presentation::PresentationMode;
use crate::realtime::DisconnectReason;

/// Notifications broadcast by a running session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The presentation mode actually changed
    ModeChanged {
        from: PresentationMode,
        to: PresentationMode,
    },
    ExchangeCompleted {
        transcript: String,
        response: String,
    },
    /// Submission failed; an apology was logged instead of the exchange
    ExchangeFailed(SessionError),
    CaptureFailed(SessionError),
    /// Release with nothing captured; no request was made
    CaptureEmpty,
    /// Negotiation or connect failed, replies stay on audio
    LiveUnavailable(SessionError),
    LiveConnected,
    LiveDisconnected(DisconnectReason),
    PlaybackFinished(Result<(), SessionError>),
}
