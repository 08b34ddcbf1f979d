// Backend client against the mock voice backend

mod common;

use common::*;
use voice_avatar::capture::{AudioFrame, Recording};
use voice_avatar::config::BackendConfig;
use voice_avatar::{BackendClient, SessionError, SessionId};

fn client(backend: &MockBackend) -> BackendClient {
    BackendClient::new(&BackendConfig {
        base_url: backend.url(),
        ..BackendConfig::default()
    })
    .unwrap()
}

fn recording() -> Recording {
    Recording::from_frames(&[AudioFrame {
        samples: vec![7; 1600],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    }])
    .unwrap()
}

#[tokio::test]
async fn test_submit_recording() {
    let backend = MockBackend::start().await;
    let session = SessionId::generate();

    let exchange = client(&backend)
        .submit_recording(&session, recording())
        .await
        .unwrap();

    assert_eq!(exchange.transcript, "hello");
    assert_eq!(exchange.response, "hi there");
    assert!(exchange.response_audio().is_some());

    let fields = backend.fields();
    let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert!(names.contains(&"audio"));
    assert!(names.contains(&"session_id"));

    let audio = fields.iter().find(|f| f.name == "audio").unwrap();
    let reader = hound::WavReader::new(std::io::Cursor::new(audio.data.clone())).unwrap();
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.len(), 1600);
}

#[tokio::test]
async fn test_server_error_status() {
    let backend = MockBackend::start().await;
    backend.fail_with(503);

    let err = client(&backend)
        .submit_recording(&SessionId::generate(), recording())
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::ServerError(503));
}

#[tokio::test]
async fn test_unparsable_reply_is_network_error() {
    let backend = MockBackend::start().await;
    backend.set_reply(serde_json::json!({ "unexpected": true }));

    let err = client(&backend)
        .submit_recording(&SessionId::generate(), recording())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NetworkError(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Bind and drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BackendClient::new(&BackendConfig {
        base_url: format!("http://{}", addr),
        ..BackendConfig::default()
    })
    .unwrap();

    let err = client
        .submit_recording(&SessionId::generate(), recording())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NetworkError(_)));
}

#[tokio::test]
async fn test_negotiate_live_room() {
    let backend = MockBackend::start().await;
    let session = SessionId::generate();

    let credentials = client(&backend).negotiate_live_room(&session).await.unwrap();
    assert_eq!(credentials.url, "wss://rooms.test");
    assert_eq!(credentials.token, "token-123");
    assert_eq!(credentials.room_name, format!("room-{}", session));
    assert_eq!(
        backend.state.room_session_id.lock().unwrap().as_deref(),
        Some(session.as_str())
    );
}

#[tokio::test]
async fn test_negotiation_refused() {
    let backend = MockBackend::start().await;
    backend.refuse_rooms();

    let err = client(&backend)
        .negotiate_live_room(&SessionId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NegotiationFailed(reason) if reason.contains("offline")));
}

#[tokio::test]
async fn test_health() {
    let backend = MockBackend::start().await;

    let report = client(&backend).health().await.unwrap();
    assert_eq!(report.status, "healthy");
    assert_eq!(report.services.get("openai"), Some(&true));
    assert_eq!(report.services.get("hedra"), Some(&false));
}
