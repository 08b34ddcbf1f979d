use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One transcript/response round trip returned by `/process-voice`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub transcript: String,
    pub response: String,
    /// Base64-encoded synthesized speech, if the backend produced any
    #[serde(default)]
    pub audio: Option<String>,
}

impl Exchange {
    /// Response audio, ignoring an empty payload
    pub fn response_audio(&self) -> Option<&str> {
        self.audio.as_deref().filter(|a| !a.trim().is_empty())
    }
}

/// `POST /create-hedra-room` body
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub session_id: String,
}

/// `POST /create-hedra-room` reply
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    #[serde(default)]
    pub success: bool,
    pub livekit_url: Option<String>,
    pub user_token: Option<String>,
    pub room_name: Option<String>,
    pub error: Option<String>,
}

/// What a transport needs to join the live avatar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomCredentials {
    /// Signaling URL (room server or stream socket)
    pub url: String,
    /// Access token; empty for the legacy stream profile
    pub token: String,
    pub room_name: String,
}

/// `POST /hedra/connect` body
#[derive(Debug, Serialize, Deserialize)]
pub struct LegacyConnectRequest {
    pub avatar_id: String,
}

/// `POST /hedra/connect` reply
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LegacyConnectResponse {
    #[serde(default)]
    pub success: bool,
    pub stream_url: Option<String>,
}

/// `POST /hedra/speak` body
#[derive(Debug, Serialize, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

/// `GET /health` reply
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Whether each upstream service is configured on the backend
    #[serde(default)]
    pub services: HashMap<String, bool>,
}

/// Error body most backend failures carry
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<String>,
}
