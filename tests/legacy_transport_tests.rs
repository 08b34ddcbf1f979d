// Legacy stream-avatar profile: /hedra/* endpoints plus the signaling socket

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voice_avatar::config::{BackendConfig, BackendProfile};
use voice_avatar::realtime::{
    DisconnectReason, LegacyStreamTransport, ParticipantRole, RoomEvent, RoomTransport, TrackKind,
};
use voice_avatar::{BackendClient, SessionError, SessionId};

#[derive(Default)]
struct StreamState {
    stream_url: Mutex<String>,
    spoken: Mutex<Vec<String>>,
    disconnects: AtomicUsize,
}

async fn start_backend(stream_url_override: Option<&str>) -> (String, Arc<StreamState>) {
    let state = Arc::new(StreamState::default());
    let app = Router::new()
        .route("/hedra/connect", post(connect))
        .route("/hedra/speak", post(speak))
        .route("/hedra/disconnect", post(disconnect))
        .route("/stream", get(stream))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    *state.stream_url.lock().unwrap() = stream_url_override
        .map(str::to_string)
        .unwrap_or_else(|| format!("ws://{}/stream", addr));
    (format!("http://{}", addr), state)
}

async fn connect(State(state): State<Arc<StreamState>>, Json(_body): Json<Value>) -> Json<Value> {
    let url = state.stream_url.lock().unwrap().clone();
    Json(json!({ "success": true, "stream_url": url }))
}

async fn speak(State(state): State<Arc<StreamState>>, Json(body): Json<Value>) -> Json<Value> {
    let text = body["text"].as_str().unwrap_or_default().to_string();
    state.spoken.lock().unwrap().push(text);
    Json(json!({ "success": true }))
}

async fn disconnect(State(state): State<Arc<StreamState>>) -> Json<Value> {
    state.disconnects.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "success": true }))
}

async fn stream(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(signal_avatar)
}

async fn signal_avatar(mut socket: WebSocket) {
    let _ = socket
        .send(Message::Text(json!({ "type": "avatar_ready" }).to_string()))
        .await;
    // Hold the socket open until the client closes it
    while let Some(Ok(message)) = socket.recv().await {
        if matches!(message, Message::Close(_)) {
            break;
        }
    }
}

fn client(base_url: String) -> BackendClient {
    BackendClient::new(&BackendConfig {
        base_url,
        profile: BackendProfile::Legacy,
        ..BackendConfig::default()
    })
    .unwrap()
}

async fn next(events: &mut tokio::sync::mpsc::Receiver<RoomEvent>) -> RoomEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for room event")
        .expect("event stream closed")
}

#[tokio::test]
async fn test_stream_avatar_lifecycle() {
    let (base_url, state) = start_backend(None).await;
    let backend = client(base_url);
    let transport = LegacyStreamTransport::new(backend.clone());

    let credentials = backend
        .negotiate_live_room(&SessionId::generate())
        .await
        .unwrap();
    assert!(credentials.url.ends_with("/stream"));

    let mut events = transport.connect(&credentials).await.unwrap();
    assert_eq!(next(&mut events).await, RoomEvent::Connected);

    let RoomEvent::ParticipantJoined(avatar) = next(&mut events).await else {
        panic!("expected the avatar to join");
    };
    assert_eq!(avatar.role, Some(ParticipantRole::Agent));

    assert_eq!(
        next(&mut events).await,
        RoomEvent::TrackReady {
            kind: TrackKind::Video,
            owner: avatar.clone(),
        }
    );

    transport.relay_response("hi there").await.unwrap();
    assert_eq!(*state.spoken.lock().unwrap(), vec!["hi there".to_string()]);

    // Only one stream at a time
    assert!(matches!(
        transport.connect(&credentials).await,
        Err(SessionError::ConnectionFailed(_))
    ));

    transport.disconnect().await.unwrap();
    assert_eq!(state.disconnects.load(Ordering::SeqCst), 1);

    // Disconnecting again has nothing to close
    transport.disconnect().await.unwrap();
    assert_eq!(state.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_placeholder_stream_url_is_rejected() {
    let (base_url, _state) = start_backend(Some("undefined")).await;

    let err = client(base_url)
        .negotiate_live_room(&SessionId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NegotiationFailed(_)));
}

/// Signaling socket that hangs up right after the upgrade
async fn start_closing_stream() -> std::net::SocketAddr {
    let app = Router::new().route(
        "/stream",
        get(|ws: WebSocketUpgrade| async move {
            ws.on_upgrade(|mut socket: WebSocket| async move {
                let _ = socket.send(Message::Close(None)).await;
            })
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn stream_credentials(addr: std::net::SocketAddr) -> voice_avatar::RoomCredentials {
    voice_avatar::RoomCredentials {
        url: format!("ws://{}/stream", addr),
        token: String::new(),
        room_name: "default-avatar-id".to_string(),
    }
}

async fn wait_for_disconnect(events: &mut tokio::sync::mpsc::Receiver<RoomEvent>) -> DisconnectReason {
    for _ in 0..3 {
        if let RoomEvent::Disconnected(reason) = next(events).await {
            return reason;
        }
    }
    panic!("expected a disconnect");
}

#[tokio::test]
async fn test_server_closing_socket_reports_disconnect() {
    let addr = start_closing_stream().await;
    let transport = LegacyStreamTransport::new(client(format!("http://{}", addr)));

    let mut events = transport.connect(&stream_credentials(addr)).await.unwrap();
    let reason = wait_for_disconnect(&mut events).await;
    assert!(matches!(
        reason,
        DisconnectReason::Remote(_) | DisconnectReason::TransportError(_)
    ));
}

#[tokio::test]
async fn test_reconnect_after_server_closes_stream() {
    let addr = start_closing_stream().await;
    let transport = LegacyStreamTransport::new(client(format!("http://{}", addr)));
    let credentials = stream_credentials(addr);

    let mut events = transport.connect(&credentials).await.unwrap();
    wait_for_disconnect(&mut events).await;

    // The dropped stream no longer occupies the transport
    let mut events = transport
        .connect(&credentials)
        .await
        .expect("reconnect after the server hung up");
    assert_eq!(next(&mut events).await, RoomEvent::Connected);
}
