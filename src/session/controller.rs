use super::event::SessionEvent;
use super::handle::{Command, Request, SessionHandle};
use super::id::SessionId;
use super::log::{ConversationLog, Speaker};
use crate::backend::{BackendClient, Exchange, RoomCredentials};
use crate::capture::{CaptureConstraints, CaptureProvider, CaptureUnit};
use crate::config::Config;
use crate::error::{SessionError, SessionResult};
use crate::playback::{AudioPlayer, DecodingPlayer, NullSink};
use crate::presentation::{
    speaking_estimate, Delivery, PresentationMode, Reconciler, Transition, View, APOLOGY,
    STATUS_CONNECTED,
    STATUS_CONNECTING, STATUS_LISTENING, STATUS_PROCESSING, STATUS_READY, STATUS_STREAM_STOPPED,
};
use crate::realtime::{
    AgentMatcher, DisconnectReason, LiveSignal, RealtimeAdapter, RoomEvent, RoomTransport,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

/// Outcomes of background work, reported back to the actor loop
enum Internal {
    Submitted(SessionResult<Exchange>),
    Negotiated(SessionResult<RoomCredentials>),
    Connected(SessionResult<mpsc::Receiver<RoomEvent>>),
    /// The avatar took the reply (and had time to say it), or refused it
    Relayed {
        generation: u64,
        result: SessionResult<()>,
        audio: Option<String>,
    },
    PlaybackDone {
        generation: u64,
        result: SessionResult<()>,
    },
}

/// Owns one voice session: capture, backend calls, live connection,
/// presentation and the conversation log
///
/// Runs as a single task. Uploads, negotiation, connect and playback are
/// spawned and report back through an internal channel, so room events keep
/// flowing while a request is pending.
pub struct SessionController {
    session_id: SessionId,
    config: Config,
    backend: BackendClient,
    capture: CaptureUnit,
    adapter: RealtimeAdapter,
    reconciler: Reconciler,
    player: Arc<dyn AudioPlayer>,
    log: Arc<Mutex<ConversationLog>>,

    /// A capture has been submitted and its response is pending
    in_flight: bool,
    /// Live start is attempted once, on the first gesture
    live_requested: bool,
    playback: Option<JoinHandle<()>>,
    /// Bumped whenever a reply is superseded by the next one
    reply_generation: u64,
}

impl SessionController {
    pub fn new(config: Config, backend: BackendClient, provider: Arc<dyn CaptureProvider>) -> Self {
        let session_id = SessionId::generate();
        info!("Creating voice session: {}", session_id);

        let capture = CaptureUnit::new(provider, CaptureConstraints::from(&config.capture));
        let adapter = RealtimeAdapter::new(None, AgentMatcher::new(config.live.agent_markers.clone()));

        Self {
            session_id,
            config,
            backend,
            capture,
            adapter,
            reconciler: Reconciler::new(),
            player: Arc::new(DecodingPlayer::new(NullSink)),
            log: Arc::new(Mutex::new(ConversationLog::new())),
            in_flight: false,
            live_requested: false,
            playback: None,
            reply_generation: 0,
        }
    }

    /// Use a live avatar transport; `None` keeps live video unavailable
    pub fn with_transport(mut self, transport: Option<Arc<dyn RoomTransport>>) -> Self {
        self.adapter = RealtimeAdapter::new(
            transport,
            AgentMatcher::new(self.config.live.agent_markers.clone()),
        );
        self
    }

    /// Use this player for response audio (default: decode and discard)
    pub fn with_player(mut self, player: Arc<dyn AudioPlayer>) -> Self {
        self.player = player;
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Start the actor loop and return a handle to it
    pub fn spawn(mut self) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);

        self.sync_view();
        let (view_tx, view_rx) = watch::channel(self.reconciler.view().clone());

        let handle = SessionHandle {
            commands: commands_tx,
            view: view_rx,
            events: events_tx.clone(),
            log: Arc::clone(&self.log),
            session_id: self.session_id.clone(),
        };

        let outputs = Outputs { view_tx, events_tx };
        tokio::spawn(self.run(commands_rx, outputs));
        handle
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Request>, outputs: Outputs) {
        let (internal_tx, mut internal_rx) = mpsc::unbounded_channel();
        let actor = Actor {
            internal: internal_tx,
            outputs,
        };

        match self.capture.probe_permission().await {
            Ok(()) => self.reconciler.view_mut().status = STATUS_READY.to_string(),
            Err(e) => {
                warn!("Microphone check failed: {}", e);
                self.reconciler.view_mut().status = e.status_text().to_string();
            }
        }
        self.publish(&actor);

        loop {
            tokio::select! {
                request = commands.recv() => {
                    let Some((command, ack)) = request else {
                        info!("All session handles dropped");
                        self.shutdown().await;
                        break;
                    };
                    let stop = matches!(command, Command::Shutdown);
                    self.handle_command(command, &actor).await;
                    self.publish(&actor);
                    let _ = ack.send(());
                    if stop {
                        break;
                    }
                }
                Some(message) = internal_rx.recv() => {
                    self.handle_internal(message, &actor).await;
                    self.publish(&actor);
                }
                event = self.adapter.next_event() => {
                    self.handle_room_event(event, &actor);
                    self.publish(&actor);
                }
            }
        }

        info!("Voice session {} stopped", self.session_id);
    }

    async fn handle_command(&mut self, command: Command, actor: &Actor) {
        debug!("Command: {:?}", command);
        match command {
            Command::Press => self.press(actor).await,
            Command::Release => self.release(actor).await,
            Command::ConnectLive => {
                self.live_requested = true;
                self.start_live(actor);
            }
            Command::Disconnect => self.disconnect(actor).await,
            Command::Shutdown => self.shutdown().await,
        }
    }

    async fn press(&mut self, actor: &Actor) {
        if !self.live_requested && self.config.live.enabled {
            self.live_requested = true;
            self.start_live(actor);
        }

        if self.capture.is_capturing() {
            debug!("Already listening");
            return;
        }
        if self.in_flight {
            info!("Previous exchange still processing, ignoring press");
            return;
        }

        match self.capture.begin().await {
            Ok(()) => self.set_status(STATUS_LISTENING),
            Err(e) => {
                error!("Failed to start capture: {}", e);
                self.set_status(e.status_text());
                actor.emit(SessionEvent::CaptureFailed(e));
            }
        }
    }

    async fn release(&mut self, actor: &Actor) {
        if !self.capture.is_capturing() {
            debug!("Release without an active capture");
            return;
        }

        match self.capture.end().await {
            Ok(recording) => {
                self.in_flight = true;
                self.set_status(STATUS_PROCESSING);

                let backend = self.backend.clone();
                let session = self.session_id.clone();
                let tx = actor.internal.clone();
                tokio::spawn(async move {
                    let result = backend.submit_recording(&session, recording).await;
                    let _ = tx.send(Internal::Submitted(result));
                });
            }
            Err(SessionError::EmptyCapture) => {
                info!("Nothing captured, not submitting");
                self.set_status(STATUS_READY);
                actor.emit(SessionEvent::CaptureEmpty);
            }
            Err(e) => {
                error!("Failed to finish capture: {}", e);
                self.set_status(e.status_text());
                actor.emit(SessionEvent::CaptureFailed(e));
            }
        }
    }

    fn start_live(&mut self, actor: &Actor) {
        if !self.adapter.begin_negotiation() {
            debug!("Live connection not started ({})", self.adapter.phase());
            return;
        }
        self.set_idle_status(STATUS_CONNECTING);

        let backend = self.backend.clone();
        let session = self.session_id.clone();
        let limit = self.live_timeout();
        let tx = actor.internal.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(limit, backend.negotiate_live_room(&session)).await
            {
                Ok(result) => result,
                Err(_) => Err(SessionError::NegotiationFailed(format!(
                    "no answer within {}s",
                    limit.as_secs()
                ))),
            };
            let _ = tx.send(Internal::Negotiated(result));
        });
    }

    async fn disconnect(&mut self, actor: &Actor) {
        if !self.adapter.disconnect().await {
            debug!("Disconnect with no live connection");
            return;
        }
        let transition = self.reconciler.user_disconnected();
        if transition.is_none() {
            self.set_idle_status(STATUS_STREAM_STOPPED);
        }
        actor.transition(transition);
        actor.emit(SessionEvent::LiveDisconnected(
            DisconnectReason::ClientInitiated,
        ));
    }

    async fn shutdown(&mut self) {
        info!("Shutting down voice session {}", self.session_id);
        self.stop_playback();
        if self.capture.is_capturing() {
            // Releases the device; the partial capture is discarded
            let _ = self.capture.end().await;
        }
        self.adapter.disconnect().await;
    }

    async fn handle_internal(&mut self, message: Internal, actor: &Actor) {
        match message {
            Internal::Submitted(Ok(exchange)) => self.exchange_received(exchange, actor).await,
            Internal::Submitted(Err(e)) => {
                self.in_flight = false;
                error!("Exchange failed: {}", e);
                if e.is_processing_failure() {
                    self.log.lock().await.append(Speaker::Assistant, APOLOGY);
                }
                self.set_status(e.status_text());
                actor.emit(SessionEvent::ExchangeFailed(e));
            }
            Internal::Negotiated(Ok(credentials)) => {
                let Some(transport) = self.adapter.begin_connect() else {
                    return;
                };
                info!("Joining live room {} via {}", credentials.room_name, transport.name());
                let limit = self.live_timeout();
                let tx = actor.internal.clone();
                tokio::spawn(async move {
                    let result = match tokio::time::timeout(limit, transport.connect(&credentials)).await {
                        Ok(result) => result,
                        Err(_) => Err(SessionError::ConnectionFailed(format!(
                            "not connected within {}s",
                            limit.as_secs()
                        ))),
                    };
                    let _ = tx.send(Internal::Connected(result));
                });
            }
            Internal::Negotiated(Err(e)) | Internal::Connected(Err(e)) => {
                warn!("Live avatar unavailable: {}", e);
                self.adapter.abandon();
                self.set_idle_status(e.status_text());
                actor.emit(SessionEvent::LiveUnavailable(e));
            }
            Internal::Connected(Ok(events)) => {
                if self.adapter.attach(events) {
                    info!("Live avatar connected");
                    self.set_idle_status(STATUS_CONNECTED);
                    actor.emit(SessionEvent::LiveConnected);
                } else if let Some(transport) = self.adapter.transport() {
                    info!("Disconnect requested while connecting, leaving again");
                    tokio::spawn(async move {
                        if let Err(e) = transport.disconnect().await {
                            warn!("Failed to leave live room: {}", e);
                        }
                    });
                }
            }
            Internal::Relayed {
                generation,
                result,
                audio,
            } => {
                if generation != self.reply_generation {
                    debug!("Ignoring relay outcome of a superseded reply");
                    return;
                }
                match result {
                    Ok(()) => self.reconciler.live_reply_spoken(),
                    Err(e) => {
                        warn!("Failed to hand response to the avatar: {}", e);
                        let (delivery, transition) = self.reconciler.relay_failed(audio.is_some());
                        actor.transition(transition);
                        if let (Delivery::PlayAudio, Some(audio)) = (delivery, audio) {
                            self.start_playback(audio, actor);
                        }
                        if self.capture.is_capturing() {
                            self.set_status(STATUS_LISTENING);
                        }
                    }
                }
            }
            Internal::PlaybackDone { generation, result } => {
                if generation != self.reply_generation {
                    debug!("Ignoring superseded playback");
                    return;
                }
                self.playback = None;
                if let Err(e) = &result {
                    warn!("Playback failed: {}", e);
                }
                let transition = self.reconciler.playback_finished();
                actor.transition(transition);
                actor.emit(SessionEvent::PlaybackFinished(result));
            }
        }
    }

    async fn exchange_received(&mut self, exchange: Exchange, actor: &Actor) {
        self.in_flight = false;
        info!("You: {}", exchange.transcript);
        info!("Avatar: {}", exchange.response);

        self.log
            .lock()
            .await
            .append_exchange(&exchange.transcript, &exchange.response);
        actor.emit(SessionEvent::ExchangeCompleted {
            transcript: exchange.transcript.clone(),
            response: exchange.response.clone(),
        });

        // A new reply always supersedes whatever is still playing
        self.stop_playback();

        let audio = exchange.response_audio().map(str::to_string);
        let (delivery, transition) = self
            .reconciler
            .exchange_received(audio.is_some(), self.adapter.is_connected());
        actor.transition(transition);

        match (delivery, audio) {
            (Delivery::LiveVideo, audio) => {
                if let Some(transport) = self.adapter.transport() {
                    let generation = self.reply_generation;
                    let tx = actor.internal.clone();
                    let text = exchange.response;
                    tokio::spawn(async move {
                        let speaking = speaking_estimate(&text);
                        let result = RealtimeAdapter::relay_response(transport, text).await;
                        if result.is_ok() {
                            tokio::time::sleep(speaking).await;
                        }
                        let _ = tx.send(Internal::Relayed {
                            generation,
                            result,
                            audio,
                        });
                    });
                }
            }
            (Delivery::PlayAudio, Some(audio)) => self.start_playback(audio, actor),
            _ => {}
        }
    }

    fn start_playback(&mut self, audio: String, actor: &Actor) {
        let generation = self.reply_generation;
        let player = Arc::clone(&self.player);
        let tx = actor.internal.clone();
        self.playback = Some(tokio::spawn(async move {
            let result = player.play(&audio).await;
            let _ = tx.send(Internal::PlaybackDone { generation, result });
        }));
    }

    fn handle_room_event(&mut self, event: RoomEvent, actor: &Actor) {
        let Some(signal) = self.adapter.handle_event(event) else {
            return;
        };
        match signal {
            LiveSignal::Connected | LiveSignal::AgentJoined(_) => {}
            LiveSignal::AvatarVideoReady(identity) => self.reconciler.avatar_attached(&identity),
            LiveSignal::AvatarVideoEnded(identity) => {
                let transition = self.reconciler.avatar_detached(&identity);
                actor.transition(transition);
            }
            LiveSignal::ConnectionLost(reason) => {
                let transition = self.reconciler.connection_lost();
                actor.transition(transition);
                actor.emit(SessionEvent::LiveDisconnected(reason));
            }
        }
    }

    fn stop_playback(&mut self) {
        self.reply_generation += 1;
        if let Some(playback) = self.playback.take() {
            debug!("Stopping previous playback");
            playback.abort();
        }
    }

    fn live_timeout(&self) -> Duration {
        Duration::from_secs(self.config.live.negotiation_timeout_secs.max(1))
    }

    fn set_status(&mut self, status: &str) {
        self.reconciler.view_mut().status = status.to_string();
    }

    /// Connection news only replaces the status while nothing else is going on
    fn set_idle_status(&mut self, status: &str) {
        if self.capture.is_capturing()
            || self.in_flight
            || self.reconciler.mode() != PresentationMode::Idle
        {
            return;
        }
        self.set_status(status);
    }

    fn sync_view(&mut self) {
        let phase = self.adapter.phase();
        let mic_active = self.capture.is_capturing();
        let view = self.reconciler.view_mut();
        view.connection = phase;
        view.mic_active = mic_active;
    }

    fn publish(&mut self, actor: &Actor) {
        self.sync_view();
        let next: View = self.reconciler.view().clone();
        actor.outputs.view_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

struct Outputs {
    view_tx: watch::Sender<View>,
    events_tx: broadcast::Sender<SessionEvent>,
}

/// Channels the actor loop owns while running
struct Actor {
    internal: mpsc::UnboundedSender<Internal>,
    outputs: Outputs,
}

impl Actor {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.outputs.events_tx.send(event);
    }

    fn transition(&self, transition: Option<Transition>) {
        if let Some(Transition { from, to }) = transition {
            self.emit(SessionEvent::ModeChanged { from, to });
        }
    }
}
