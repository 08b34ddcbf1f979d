use crate::realtime::ConnectionPhase;
use serde::Serialize;
use std::fmt;

pub const STATUS_READY: &str = "Ready to listen";
pub const STATUS_LISTENING: &str = "Listening... Release to send";
pub const STATUS_PROCESSING: &str = "Processing...";
pub const STATUS_CONNECTING: &str = "Connecting to live avatar...";
pub const STATUS_CONNECTED: &str = "Connected to live avatar";
pub const STATUS_SPEAKING: &str = "Avatar speaking...";
pub const STATUS_LIVE_SPEAKING: &str = "Avatar speaking... Click stop to end stream";
pub const STATUS_STREAM_STOPPED: &str = "Stream stopped. Ready to listen";

/// Assistant line appended when an exchange could not be processed
pub const APOLOGY: &str = "Sorry, I had trouble processing that. Please try again.";

/// Which presentation is active; exactly one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PresentationMode {
    Idle,
    AudioPlayback,
    LiveVideo,
}

impl fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresentationMode::Idle => f.write_str("idle"),
            PresentationMode::AudioPlayback => f.write_str("audio"),
            PresentationMode::LiveVideo => f.write_str("video"),
        }
    }
}

/// Everything a host UI needs to render the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub status: String,
    pub mode: PresentationMode,
    pub connection: ConnectionPhase,
    /// Mic button shows the recording state
    pub mic_active: bool,
    pub speaking_indicator: bool,
    pub video_visible: bool,
    /// Static avatar image (shown whenever video is not)
    pub image_visible: bool,
    pub stop_control_visible: bool,
}

impl Default for View {
    fn default() -> Self {
        Self {
            status: STATUS_READY.to_string(),
            mode: PresentationMode::Idle,
            connection: ConnectionPhase::Disconnected,
            mic_active: false,
            speaking_indicator: false,
            video_visible: false,
            image_visible: true,
            stop_control_visible: false,
        }
    }
}

impl View {
    /// Undo every mode artifact, leaving the idle presentation
    pub(crate) fn clear_artifacts(&mut self) {
        self.speaking_indicator = false;
        self.video_visible = false;
        self.image_visible = true;
        self.stop_control_visible = false;
    }
}
