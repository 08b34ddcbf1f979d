//! Presentation mode reconciliation
//!
//! Decides which of idle, audio playback or live video is shown and keeps
//! the view consistent with that choice as exchanges, track events and
//! playback completions arrive in any order.

mod reconciler;
mod view;

pub use reconciler::{speaking_estimate, Delivery, Reconciler, Transition};
pub use view::{
    PresentationMode, View, APOLOGY, STATUS_CONNECTED, STATUS_CONNECTING, STATUS_LISTENING,
    STATUS_LIVE_SPEAKING, STATUS_PROCESSING, STATUS_READY, STATUS_SPEAKING,
    STATUS_STREAM_STOPPED,
};
