//! Stream-avatar transport for the legacy backend profile.
//!
//! The backend opens the avatar stream (`/hedra/connect`) and hands back a
//! signaling socket URL. The socket reports `{"type": "avatar_ready"}` once
//! the avatar video is live. Replies are spoken through `/hedra/speak`.

use super::events::{DisconnectReason, Participant, ParticipantRole, RoomEvent, TrackKind};
use super::transport::RoomTransport;
use crate::backend::{BackendClient, RoomCredentials};
use crate::error::{SessionError, SessionResult};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
struct SignalMessage {
    #[serde(rename = "type")]
    kind: String,
}

struct StreamConnection {
    id: u64,
    close_tx: oneshot::Sender<()>,
    reader: JoinHandle<()>,
}

type ConnectionSlot = Arc<Mutex<Option<StreamConnection>>>;

pub struct LegacyStreamTransport {
    backend: BackendClient,
    /// Shared with the socket reader, which empties it when the server hangs up
    connection: ConnectionSlot,
    next_id: AtomicU64,
}

impl LegacyStreamTransport {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            connection: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Forget connection `id` if it still occupies the slot
    async fn release(slot: &ConnectionSlot, id: u64) {
        let mut slot = slot.lock().await;
        if slot.as_ref().is_some_and(|c| c.id == id) {
            *slot = None;
        }
    }

    /// The server ended the stream: free the slot, then report it
    async fn lost(
        slot: &ConnectionSlot,
        id: u64,
        events_tx: &mpsc::Sender<RoomEvent>,
        reason: DisconnectReason,
    ) {
        Self::release(slot, id).await;
        let _ = events_tx.send(RoomEvent::Disconnected(reason)).await;
    }

    fn avatar(credentials: &RoomCredentials) -> Participant {
        Participant::with_role(
            format!("hedra-avatar-{}", credentials.room_name),
            ParticipantRole::Agent,
        )
    }

    fn translate(kind: &str, avatar: &Participant) -> Option<RoomEvent> {
        match kind {
            "avatar_ready" => Some(RoomEvent::TrackReady {
                kind: TrackKind::Video,
                owner: avatar.clone(),
            }),
            "avatar_stopped" | "stream_ended" => Some(RoomEvent::TrackEnded {
                kind: TrackKind::Video,
                owner: avatar.clone(),
            }),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl RoomTransport for LegacyStreamTransport {
    async fn connect(
        &self,
        credentials: &RoomCredentials,
    ) -> SessionResult<mpsc::Receiver<RoomEvent>> {
        let mut connection = self.connection.lock().await;
        if connection.is_some() {
            return Err(SessionError::ConnectionFailed(
                "stream already connected".to_string(),
            ));
        }

        info!("Opening avatar stream socket: {}", credentials.url);

        let (ws_stream, _) = connect_async(credentials.url.as_str())
            .await
            .map_err(|e| SessionError::ConnectionFailed(format!("WebSocket connect failed: {e}")))?;

        let (mut write, mut read) = ws_stream.split();
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (close_tx, mut close_rx) = oneshot::channel();
        let avatar = Self::avatar(credentials);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::clone(&self.connection);

        let reader = tokio::spawn(async move {
            let _ = events_tx.send(RoomEvent::Connected).await;
            let _ = events_tx
                .send(RoomEvent::ParticipantJoined(avatar.clone()))
                .await;

            loop {
                tokio::select! {
                    _ = &mut close_rx => {
                        if let Err(e) = write.close().await {
                            debug!("Avatar socket close error: {}", e);
                        }
                        break;
                    }
                    message = read.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<SignalMessage>(&text) {
                                Ok(signal) => {
                                    if let Some(event) = Self::translate(&signal.kind, &avatar) {
                                        if events_tx.send(event).await.is_err() {
                                            break;
                                        }
                                    } else {
                                        debug!("Ignoring avatar signal: {}", signal.kind);
                                    }
                                }
                                Err(e) => warn!("Unparsable avatar signal: {}", e),
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let detail = frame
                                .map(|f| f.reason.to_string())
                                .unwrap_or_else(|| "closed".to_string());
                            let reason = DisconnectReason::Remote(detail);
                            Self::lost(&slot, id, &events_tx, reason).await;
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("Avatar socket error: {}", e);
                            let reason = DisconnectReason::TransportError(e.to_string());
                            Self::lost(&slot, id, &events_tx, reason).await;
                            break;
                        }
                        None => {
                            let reason = DisconnectReason::Remote("stream ended".to_string());
                            Self::lost(&slot, id, &events_tx, reason).await;
                            break;
                        }
                    }
                }
            }

            info!("Avatar socket reader finished");
        });

        *connection = Some(StreamConnection {
            id,
            close_tx,
            reader,
        });
        Ok(events_rx)
    }

    async fn disconnect(&self) -> SessionResult<()> {
        let Some(connection) = self.connection.lock().await.take() else {
            return Ok(());
        };

        let _ = connection.close_tx.send(());
        let _ = tokio::time::timeout(std::time::Duration::from_millis(500), connection.reader).await;

        if !self.backend.legacy_disconnect().await {
            warn!("Backend did not acknowledge stream disconnect");
        }
        Ok(())
    }

    async fn relay_response(&self, text: &str) -> SessionResult<()> {
        if self.backend.legacy_speak(text).await {
            Ok(())
        } else {
            Err(SessionError::ConnectionFailed(
                "avatar rejected the reply".to_string(),
            ))
        }
    }

    fn name(&self) -> &str {
        "legacy-stream"
    }
}
