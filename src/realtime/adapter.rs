use super::events::{DisconnectReason, RoomEvent, TrackKind};
use super::identity::AgentMatcher;
use super::transport::RoomTransport;
use crate::error::SessionResult;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where the single live connection stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionPhase {
    /// No real-time transport on this client
    Unavailable,
    Disconnected,
    /// Asking the backend for credentials
    Negotiating,
    /// Joining with the credentials
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionPhase::Unavailable => "unavailable",
            ConnectionPhase::Disconnected => "disconnected",
            ConnectionPhase::Negotiating => "negotiating",
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// What a room event means for the presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveSignal {
    Connected,
    AgentJoined(String),
    AvatarVideoReady(String),
    AvatarVideoEnded(String),
    ConnectionLost(DisconnectReason),
}

/// Wraps the optional live connection and classifies its events
///
/// The adapter only tracks state; the controller runs negotiation and
/// `connect` in background tasks and reports the outcomes back here.
pub struct RealtimeAdapter {
    transport: Option<Arc<dyn RoomTransport>>,
    matcher: AgentMatcher,
    phase: ConnectionPhase,
    events: Option<mpsc::Receiver<RoomEvent>>,
    /// Disconnect was requested while negotiating or connecting
    teardown_pending: bool,
}

impl RealtimeAdapter {
    pub fn new(transport: Option<Arc<dyn RoomTransport>>, matcher: AgentMatcher) -> Self {
        let phase = if transport.is_some() {
            ConnectionPhase::Disconnected
        } else {
            ConnectionPhase::Unavailable
        };
        Self {
            transport,
            matcher,
            phase,
            events: None,
            teardown_pending: false,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    pub fn transport(&self) -> Option<Arc<dyn RoomTransport>> {
        self.transport.clone()
    }

    /// Move to `Negotiating` if a connection may be started now
    pub fn begin_negotiation(&mut self) -> bool {
        if self.phase != ConnectionPhase::Disconnected {
            return false;
        }
        self.phase = ConnectionPhase::Negotiating;
        self.teardown_pending = false;
        true
    }

    /// Credentials arrived; returns the transport to connect with
    ///
    /// `None` when the user disconnected in the meantime.
    pub fn begin_connect(&mut self) -> Option<Arc<dyn RoomTransport>> {
        if self.phase != ConnectionPhase::Negotiating {
            return None;
        }
        if self.teardown_pending {
            info!("Dropping negotiated room, disconnect was requested");
            self.reset();
            return None;
        }
        self.phase = ConnectionPhase::Connecting;
        self.transport.clone()
    }

    /// Negotiation or connect did not succeed
    pub fn abandon(&mut self) {
        if matches!(
            self.phase,
            ConnectionPhase::Negotiating | ConnectionPhase::Connecting
        ) {
            self.reset();
        }
    }

    /// Take ownership of a fresh connection's events
    ///
    /// Returns false when the connection must be torn down instead.
    pub fn attach(&mut self, events: mpsc::Receiver<RoomEvent>) -> bool {
        if self.phase != ConnectionPhase::Connecting || self.teardown_pending {
            self.reset();
            return false;
        }
        self.phase = ConnectionPhase::Connected;
        self.events = Some(events);
        true
    }

    /// Next event from the live connection; pends forever without one
    ///
    /// A closed event stream is reported once as a transport disconnect.
    pub async fn next_event(&mut self) -> RoomEvent {
        let Some(events) = self.events.as_mut() else {
            return std::future::pending().await;
        };
        match events.recv().await {
            Some(event) => event,
            None => {
                self.events = None;
                RoomEvent::Disconnected(DisconnectReason::TransportError(
                    "event stream closed".to_string(),
                ))
            }
        }
    }

    /// Update connection state and classify the event
    pub fn handle_event(&mut self, event: RoomEvent) -> Option<LiveSignal> {
        match event {
            RoomEvent::Connected => {
                debug!("Live connection confirmed");
                Some(LiveSignal::Connected)
            }
            RoomEvent::Disconnected(reason) => {
                warn!("Live connection lost: {}", reason);
                self.reset();
                Some(LiveSignal::ConnectionLost(reason))
            }
            RoomEvent::ParticipantJoined(participant) => {
                if self.matcher.is_agent(&participant) {
                    info!("Avatar agent joined: {}", participant.identity);
                    Some(LiveSignal::AgentJoined(participant.identity))
                } else {
                    debug!("Participant joined: {}", participant.identity);
                    None
                }
            }
            RoomEvent::ParticipantLeft(participant) => {
                if self.matcher.is_agent(&participant) {
                    info!("Avatar agent left: {}", participant.identity);
                    Some(LiveSignal::AvatarVideoEnded(participant.identity))
                } else {
                    debug!("Participant left: {}", participant.identity);
                    None
                }
            }
            RoomEvent::TrackReady { kind, owner } => {
                if kind == TrackKind::Video && self.matcher.is_agent(&owner) {
                    info!("Avatar video ready from {}", owner.identity);
                    Some(LiveSignal::AvatarVideoReady(owner.identity))
                } else {
                    debug!("Ignoring {:?} track from {}", kind, owner.identity);
                    None
                }
            }
            RoomEvent::TrackEnded { kind, owner } => {
                if kind == TrackKind::Video && self.matcher.is_agent(&owner) {
                    info!("Avatar video ended from {}", owner.identity);
                    Some(LiveSignal::AvatarVideoEnded(owner.identity))
                } else {
                    None
                }
            }
        }
    }

    /// Tear the connection down
    ///
    /// Returns whether a live connection existed. Never connected is a no-op;
    /// a connection still being set up is torn down as soon as it arrives.
    pub async fn disconnect(&mut self) -> bool {
        match self.phase {
            ConnectionPhase::Connected => {
                if let Some(transport) = &self.transport {
                    info!("Disconnecting {}", transport.name());
                    if let Err(e) = transport.disconnect().await {
                        warn!("Error while disconnecting {}: {}", transport.name(), e);
                    }
                }
                self.reset();
                true
            }
            ConnectionPhase::Negotiating | ConnectionPhase::Connecting => {
                self.teardown_pending = true;
                false
            }
            ConnectionPhase::Disconnected | ConnectionPhase::Unavailable => false,
        }
    }

    /// Pass the reply text to the avatar when the transport needs it
    pub async fn relay_response(transport: Arc<dyn RoomTransport>, text: String) -> SessionResult<()> {
        transport.relay_response(&text).await
    }

    fn reset(&mut self) {
        self.events = None;
        self.teardown_pending = false;
        if self.phase != ConnectionPhase::Unavailable {
            self.phase = ConnectionPhase::Disconnected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RoomCredentials;
    use crate::realtime::events::{Participant, ParticipantRole};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        disconnects: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl RoomTransport for CountingTransport {
        async fn connect(
            &self,
            _credentials: &RoomCredentials,
        ) -> SessionResult<mpsc::Receiver<RoomEvent>> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn disconnect(&self) -> SessionResult<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn adapter() -> (RealtimeAdapter, Arc<CountingTransport>) {
        let transport = Arc::new(CountingTransport::default());
        let adapter = RealtimeAdapter::new(Some(transport.clone()), AgentMatcher::default());
        (adapter, transport)
    }

    #[tokio::test]
    async fn test_unavailable_without_transport() {
        let mut adapter = RealtimeAdapter::new(None, AgentMatcher::default());
        assert_eq!(adapter.phase(), ConnectionPhase::Unavailable);
        assert!(!adapter.begin_negotiation());
        assert!(!adapter.disconnect().await);
        assert_eq!(adapter.phase(), ConnectionPhase::Unavailable);
    }

    #[tokio::test]
    async fn test_disconnect_never_connected_is_noop() {
        let (mut adapter, transport) = adapter();
        assert!(!adapter.disconnect().await);
        assert_eq!(transport.disconnects.load(Ordering::SeqCst), 0);
        assert_eq!(adapter.phase(), ConnectionPhase::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_lifecycle() {
        let (mut adapter, transport) = adapter();
        assert!(adapter.begin_negotiation());
        assert!(!adapter.begin_negotiation(), "one connection at a time");
        assert!(adapter.begin_connect().is_some());

        let (_tx, rx) = mpsc::channel(4);
        assert!(adapter.attach(rx));
        assert!(adapter.is_connected());

        assert!(adapter.disconnect().await);
        assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.phase(), ConnectionPhase::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_during_negotiation() {
        let (mut adapter, _transport) = adapter();
        adapter.begin_negotiation();
        assert!(!adapter.disconnect().await);
        assert!(adapter.begin_connect().is_none());
        assert_eq!(adapter.phase(), ConnectionPhase::Disconnected);
    }

    #[tokio::test]
    async fn test_closed_stream_reports_disconnect() {
        let (mut adapter, _transport) = adapter();
        adapter.begin_negotiation();
        adapter.begin_connect();
        let (tx, rx) = mpsc::channel(4);
        adapter.attach(rx);
        drop(tx);

        let event = adapter.next_event().await;
        assert!(matches!(
            adapter.handle_event(event),
            Some(LiveSignal::ConnectionLost(DisconnectReason::TransportError(_)))
        ));
        assert_eq!(adapter.phase(), ConnectionPhase::Disconnected);
    }

    #[test]
    fn test_classification() {
        let (mut adapter, _transport) = adapter();
        let agent = Participant::new("hedra-agent-1");
        let user = Participant::with_role("user-session_x", ParticipantRole::User);

        assert_eq!(
            adapter.handle_event(RoomEvent::TrackReady {
                kind: TrackKind::Video,
                owner: agent.clone()
            }),
            Some(LiveSignal::AvatarVideoReady("hedra-agent-1".to_string()))
        );
        assert_eq!(
            adapter.handle_event(RoomEvent::TrackReady {
                kind: TrackKind::Audio,
                owner: agent.clone()
            }),
            None
        );
        assert_eq!(
            adapter.handle_event(RoomEvent::TrackReady {
                kind: TrackKind::Video,
                owner: user
            }),
            None
        );
        assert_eq!(
            adapter.handle_event(RoomEvent::ParticipantJoined(agent)),
            Some(LiveSignal::AgentJoined("hedra-agent-1".to_string()))
        );
    }

    #[test]
    fn test_agent_leaving_ends_its_video() {
        let (mut adapter, _transport) = adapter();

        assert_eq!(
            adapter.handle_event(RoomEvent::ParticipantLeft(Participant::new("hedra-agent-1"))),
            Some(LiveSignal::AvatarVideoEnded("hedra-agent-1".to_string()))
        );
        assert_eq!(
            adapter.handle_event(RoomEvent::ParticipantLeft(Participant::with_role(
                "user-session_x",
                ParticipantRole::User
            ))),
            None
        );
    }
}
