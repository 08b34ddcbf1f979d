//! Optional live avatar connection
//!
//! The media SDK sits behind [`RoomTransport`]. Which transport (if any) is
//! usable is decided once at startup by [`probe_transport`].

mod adapter;
mod events;
mod identity;
mod legacy;
#[cfg(feature = "livekit")]
mod livekit;
mod transport;

pub use adapter::{ConnectionPhase, LiveSignal, RealtimeAdapter};
pub use events::{DisconnectReason, Participant, ParticipantRole, RoomEvent, TrackKind};
pub use identity::{AgentMatcher, AGENT_IDENTITY_MARKERS};
pub use legacy::LegacyStreamTransport;
#[cfg(feature = "livekit")]
pub use livekit::LiveKitTransport;
pub use transport::RoomTransport;

use crate::backend::BackendClient;
use crate::config::{BackendProfile, Config};
use std::sync::Arc;
use tracing::{info, warn};

/// Pick the transport for the configured backend profile
///
/// `None` means live video is unavailable and replies fall back to audio.
pub fn probe_transport(config: &Config, backend: &BackendClient) -> Option<Arc<dyn RoomTransport>> {
    if !config.live.enabled {
        info!("Live avatar disabled in config");
        return None;
    }

    match config.backend.profile {
        BackendProfile::Legacy => {
            info!("Live avatar via legacy stream transport");
            Some(Arc::new(LegacyStreamTransport::new(backend.clone())))
        }
        BackendProfile::Room => room_transport(),
    }
}

#[cfg(feature = "livekit")]
fn room_transport() -> Option<Arc<dyn RoomTransport>> {
    info!("Live avatar via LiveKit rooms");
    Some(Arc::new(LiveKitTransport::new()))
}

#[cfg(not(feature = "livekit"))]
fn room_transport() -> Option<Arc<dyn RoomTransport>> {
    warn!("Built without the livekit feature, live avatar unavailable");
    None
}
