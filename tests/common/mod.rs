// Shared fixtures for integration tests: a mock voice backend (axum), a
// scriptable room transport and a player that records what it was given.

#![allow(dead_code)]

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use voice_avatar::backend::RoomCredentials;
use voice_avatar::playback::{AudioSink, DecodedAudio};
use voice_avatar::realtime::{Participant, RoomEvent, RoomTransport, TrackKind};
use voice_avatar::{AudioFrame, SessionError, SessionEvent, SessionResult, View};

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ReceivedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Knobs and counters shared with the mock backend's handlers
pub struct MockState {
    pub voice_requests: AtomicUsize,
    pub room_requests: AtomicUsize,
    pub voice_status: AtomicU16,
    pub voice_delay_ms: AtomicU64,
    pub room_success: AtomicBool,
    pub reply: Mutex<Value>,
    pub fields: Mutex<Vec<ReceivedField>>,
    pub room_session_id: Mutex<Option<String>>,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            voice_requests: AtomicUsize::new(0),
            room_requests: AtomicUsize::new(0),
            voice_status: AtomicU16::new(200),
            voice_delay_ms: AtomicU64::new(0),
            room_success: AtomicBool::new(true),
            reply: Mutex::new(json!({
                "transcript": "hello",
                "response": "hi there",
                "audio": reply_audio_base64(),
            })),
            fields: Mutex::new(Vec::new()),
            room_session_id: Mutex::new(None),
        });

        let app = Router::new()
            .route("/process-voice", post(process_voice))
            .route("/create-hedra-room", post(create_room))
            .route("/health", get(health))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn voice_requests(&self) -> usize {
        self.state.voice_requests.load(Ordering::SeqCst)
    }

    pub fn room_requests(&self) -> usize {
        self.state.room_requests.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, status: u16) {
        self.state.voice_status.store(status, Ordering::SeqCst);
    }

    pub fn delay_replies(&self, ms: u64) {
        self.state.voice_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn refuse_rooms(&self) {
        self.state.room_success.store(false, Ordering::SeqCst);
    }

    pub fn set_reply(&self, reply: Value) {
        *self.state.reply.lock().unwrap() = reply;
    }

    pub fn fields(&self) -> Vec<ReceivedField> {
        self.state.fields.lock().unwrap().clone()
    }
}

async fn process_voice(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    state.voice_requests.fetch_add(1, Ordering::SeqCst);

    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        fields.push(ReceivedField {
            name,
            file_name,
            content_type,
            data,
        });
    }
    *state.fields.lock().unwrap() = fields;

    let delay = state.voice_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let status = state.voice_status.load(Ordering::SeqCst);
    if status != 200 {
        let code = StatusCode::from_u16(status).unwrap();
        return (code, Json(json!({ "error": "processing failed" }))).into_response();
    }

    let reply = state.reply.lock().unwrap().clone();
    Json(reply).into_response()
}

async fn create_room(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.room_requests.fetch_add(1, Ordering::SeqCst);
    let session_id = body["session_id"].as_str().unwrap_or_default().to_string();
    *state.room_session_id.lock().unwrap() = Some(session_id.clone());

    if !state.room_success.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "avatar agent offline" })),
        )
            .into_response();
    }

    Json(json!({
        "success": true,
        "livekit_url": "wss://rooms.test",
        "user_token": "token-123",
        "room_name": format!("room-{}", session_id),
    }))
    .into_response()
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": "2026-01-01T00:00:00Z",
        "services": { "openai": true, "hedra": false },
    }))
}

/// 16-bit mono WAV bytes
pub fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// A short, decodable reply clip
pub fn reply_audio_base64() -> String {
    let samples: Vec<i16> = (0..1600).map(|i| ((i % 40) * 200) as i16).collect();
    general_purpose::STANDARD.encode(wav_bytes(&samples, 16000))
}

/// 100ms of "speech" at the default capture rate
pub fn speech_frame(index: u64) -> AudioFrame {
    AudioFrame {
        samples: (0..4410).map(|i| ((i % 50) * 100) as i16).collect(),
        sample_rate: 44100,
        channels: 1,
        timestamp_ms: index * 100,
    }
}

/// Room transport driven by the test
///
/// Holds one connection at a time, like the real transports: a second
/// connect fails until the first is disconnected or dropped by the remote.
#[derive(Default)]
pub struct FakeTransport {
    events: Mutex<Option<mpsc::Sender<RoomEvent>>>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub relayed: Mutex<Vec<String>>,
    /// Make the avatar reject replies
    pub refuse_relay: AtomicBool,
}

impl FakeTransport {
    /// Deliver an event on the live connection
    ///
    /// A `Disconnected` event releases the connection first.
    pub async fn emit(&self, event: RoomEvent) {
        let tx = if matches!(event, RoomEvent::Disconnected(_)) {
            self.events.lock().unwrap().take()
        } else {
            self.events.lock().unwrap().clone()
        };
        tx.expect("not connected").send(event).await.unwrap();
    }

    pub fn is_connected(&self) -> bool {
        self.events.lock().unwrap().is_some()
    }

    pub fn agent_video(&self) -> RoomEvent {
        RoomEvent::TrackReady {
            kind: TrackKind::Video,
            owner: Participant::new("hedra-agent-7"),
        }
    }

    pub fn agent_video_ended(&self) -> RoomEvent {
        RoomEvent::TrackEnded {
            kind: TrackKind::Video,
            owner: Participant::new("hedra-agent-7"),
        }
    }
}

#[async_trait::async_trait]
impl RoomTransport for FakeTransport {
    async fn connect(
        &self,
        _credentials: &RoomCredentials,
    ) -> SessionResult<mpsc::Receiver<RoomEvent>> {
        let mut slot = self.events.lock().unwrap();
        if slot.is_some() {
            return Err(SessionError::ConnectionFailed(
                "already connected".to_string(),
            ));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        tx.try_send(RoomEvent::Connected).unwrap();
        *slot = Some(tx);
        Ok(rx)
    }

    async fn disconnect(&self) -> SessionResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().take();
        Ok(())
    }

    async fn relay_response(&self, text: &str) -> SessionResult<()> {
        self.relayed.lock().unwrap().push(text.to_string());
        if self.refuse_relay.load(Ordering::SeqCst) {
            return Err(SessionError::ConnectionFailed(
                "avatar rejected the reply".to_string(),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Sink that keeps every decoded clip
#[derive(Default, Clone)]
pub struct CollectingSink {
    pub clips: Arc<Mutex<Vec<DecodedAudio>>>,
}

impl CollectingSink {
    pub fn played(&self) -> usize {
        self.clips.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl AudioSink for CollectingSink {
    async fn play(&self, audio: DecodedAudio) -> SessionResult<()> {
        self.clips.lock().unwrap().push(audio);
        Ok(())
    }
}

/// Wait for the first event matching `pred`
pub async fn wait_for_event<F>(events: &mut broadcast::Receiver<SessionEvent>, pred: F) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => {}
                Err(e) => panic!("event stream failed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for session event")
}

/// Wait until the published view satisfies `pred`
pub async fn wait_for_view<F>(view: &mut watch::Receiver<View>, pred: F) -> View
where
    F: FnMut(&View) -> bool,
{
    tokio::time::timeout(WAIT, view.wait_for(pred))
        .await
        .expect("timed out waiting for view")
        .expect("session stopped")
        .clone()
}

/// Everything already broadcast, without waiting
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
