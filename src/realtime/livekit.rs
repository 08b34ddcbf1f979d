//! LiveKit room transport for the room-negotiation backend profile.

use super::events::{DisconnectReason, Participant, RoomEvent, TrackKind};
use super::transport::RoomTransport;
use crate::backend::RoomCredentials;
use crate::error::{SessionError, SessionResult};
use livekit::prelude::{RemoteTrack, Room, RoomEvent as LkRoomEvent, RoomOptions};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 64;

#[derive(Default)]
pub struct LiveKitTransport {
    /// Shared with the event pump, which closes the room when it drops
    room: Arc<Mutex<Option<Room>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl LiveKitTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn track_kind(track: &RemoteTrack) -> TrackKind {
        match track {
            RemoteTrack::Audio(_) => TrackKind::Audio,
            RemoteTrack::Video(_) => TrackKind::Video,
        }
    }

    async fn release_room(slot: &Mutex<Option<Room>>) {
        let Some(room) = slot.lock().await.take() else {
            return;
        };
        info!("Leaving LiveKit room");
        if let Err(e) = room.close().await {
            warn!("Error while closing room: {:?}", e);
        }
    }

    fn translate(event: LkRoomEvent) -> Option<RoomEvent> {
        match event {
            LkRoomEvent::ParticipantConnected(participant) => {
                Some(RoomEvent::ParticipantJoined(Participant::with_metadata(
                    participant.identity().to_string(),
                    &participant.metadata(),
                )))
            }
            LkRoomEvent::TrackSubscribed {
                track, participant, ..
            } => Some(RoomEvent::TrackReady {
                kind: Self::track_kind(&track),
                owner: Participant::with_metadata(
                    participant.identity().to_string(),
                    &participant.metadata(),
                ),
            }),
            LkRoomEvent::TrackUnsubscribed {
                track, participant, ..
            } => Some(RoomEvent::TrackEnded {
                kind: Self::track_kind(&track),
                owner: Participant::with_metadata(
                    participant.identity().to_string(),
                    &participant.metadata(),
                ),
            }),
            LkRoomEvent::ParticipantDisconnected(participant) => {
                Some(RoomEvent::ParticipantLeft(Participant::with_metadata(
                    participant.identity().to_string(),
                    &participant.metadata(),
                )))
            }
            LkRoomEvent::Disconnected { reason } => Some(RoomEvent::Disconnected(
                DisconnectReason::Remote(format!("{reason:?}")),
            )),
            other => {
                debug!("Ignoring room event: {:?}", other);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl RoomTransport for LiveKitTransport {
    async fn connect(
        &self,
        credentials: &RoomCredentials,
    ) -> SessionResult<mpsc::Receiver<RoomEvent>> {
        let mut room_slot = self.room.lock().await;
        if room_slot.is_some() {
            return Err(SessionError::ConnectionFailed(
                "room already connected".to_string(),
            ));
        }

        info!(
            "Connecting to LiveKit room {} at {}",
            credentials.room_name, credentials.url
        );

        let (room, mut room_events) =
            Room::connect(&credentials.url, &credentials.token, RoomOptions::default())
                .await
                .map_err(|e| {
                    SessionError::ConnectionFailed(format!("Failed to connect to room: {e:?}"))
                })?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        // Participants already in the room before we joined
        let present: Vec<Participant> = room
            .remote_participants()
            .values()
            .map(|p| Participant::with_metadata(p.identity().to_string(), &p.metadata()))
            .collect();

        let slot = Arc::clone(&self.room);
        let pump = tokio::spawn(async move {
            if events_tx.send(RoomEvent::Connected).await.is_err() {
                return;
            }
            for participant in present {
                if events_tx
                    .send(RoomEvent::ParticipantJoined(participant))
                    .await
                    .is_err()
                {
                    return;
                }
            }

            let mut lost = None;
            while let Some(event) = room_events.recv().await {
                match Self::translate(event) {
                    Some(RoomEvent::Disconnected(reason)) => {
                        lost = Some(reason);
                        break;
                    }
                    Some(event) => {
                        if events_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    None => {}
                }
            }

            // The room is gone; free the slot before telling anyone
            Self::release_room(&slot).await;
            let reason = lost.unwrap_or_else(|| {
                DisconnectReason::TransportError("room event stream ended".to_string())
            });
            let _ = events_tx.send(RoomEvent::Disconnected(reason)).await;
            info!("Room event pump finished");
        });

        *room_slot = Some(room);
        *self.pump.lock().await = Some(pump);
        Ok(events_rx)
    }

    async fn disconnect(&self) -> SessionResult<()> {
        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }
        Self::release_room(&self.room).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "livekit"
    }
}
