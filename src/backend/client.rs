use super::messages::{
    CreateRoomRequest, CreateRoomResponse, ErrorResponse, Exchange, HealthReport,
    LegacyConnectRequest, LegacyConnectResponse, RoomCredentials, SpeakRequest,
};
use crate::capture::Recording;
use crate::config::{BackendConfig, BackendProfile};
use crate::error::{SessionError, SessionResult};
use crate::session::SessionId;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client for the voice-processing backend
///
/// No call is retried; callers decide.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    profile: BackendProfile,
    avatar_id: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> SessionResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| SessionError::NetworkError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile,
            avatar_id: config.avatar_id.clone(),
        })
    }

    pub fn profile(&self) -> BackendProfile {
        self.profile
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload a recording and get the transcript/response exchange back
    ///
    /// The recording is consumed; it is gone once this returns.
    pub async fn submit_recording(
        &self,
        session: &SessionId,
        recording: Recording,
    ) -> SessionResult<Exchange> {
        let bytes = recording.wav.len();
        let audio = Part::bytes(recording.wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| SessionError::NetworkError(format!("Invalid MIME type: {e}")))?;

        let form = Form::new()
            .part("audio", audio)
            .text("session_id", session.to_string());

        info!("Submitting recording ({} bytes) for {}", bytes, session);

        let response = self
            .http
            .post(self.url("/process-voice"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| SessionError::NetworkError(format!("Request failed: {e}")))?;

        let response = Self::require_success(response).await?;

        let exchange: Exchange = response
            .json()
            .await
            .map_err(|e| SessionError::NetworkError(format!("Invalid response body: {e}")))?;

        debug!(
            "Exchange received: transcript={:?}, audio={}",
            exchange.transcript,
            exchange.response_audio().is_some()
        );

        Ok(exchange)
    }

    /// Obtain live-avatar credentials for the configured profile
    ///
    /// Every failure is `NegotiationFailed`; the live avatar is optional.
    pub async fn negotiate_live_room(&self, session: &SessionId) -> SessionResult<RoomCredentials> {
        match self.profile {
            BackendProfile::Room => self.create_room(session).await,
            BackendProfile::Legacy => self.legacy_connect().await,
        }
    }

    async fn create_room(&self, session: &SessionId) -> SessionResult<RoomCredentials> {
        info!("Requesting live avatar room for {}", session);

        let response = self
            .http
            .post(self.url("/create-hedra-room"))
            .json(&CreateRoomRequest {
                session_id: session.to_string(),
            })
            .send()
            .await
            .map_err(|e| SessionError::NegotiationFailed(format!("Request failed: {e}")))?;

        let status = response.status();
        // Failure replies still carry {success:false, error}
        let body: CreateRoomResponse = response.json().await.unwrap_or_default();

        if !status.is_success() || !body.success {
            let reason = body
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!("Live room negotiation failed: {}", reason);
            return Err(SessionError::NegotiationFailed(reason));
        }

        match (body.livekit_url, body.user_token, body.room_name) {
            (Some(url), Some(token), Some(room_name)) if !url.is_empty() && !token.is_empty() => {
                info!("Live avatar room ready: {}", room_name);
                Ok(RoomCredentials {
                    url,
                    token,
                    room_name,
                })
            }
            _ => Err(SessionError::NegotiationFailed(
                "incomplete room credentials".to_string(),
            )),
        }
    }

    /// Legacy profile: ask the backend to open an avatar stream
    pub async fn legacy_connect(&self) -> SessionResult<RoomCredentials> {
        info!("Connecting to stream avatar {}", self.avatar_id);

        let response = self
            .http
            .post(self.url("/hedra/connect"))
            .json(&LegacyConnectRequest {
                avatar_id: self.avatar_id.clone(),
            })
            .send()
            .await
            .map_err(|e| SessionError::NegotiationFailed(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SessionError::NegotiationFailed(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: LegacyConnectResponse = response
            .json()
            .await
            .map_err(|e| SessionError::NegotiationFailed(format!("Invalid response body: {e}")))?;

        match body.stream_url {
            Some(url) if body.success && is_usable_stream_url(&url) => Ok(RoomCredentials {
                url,
                token: String::new(),
                room_name: self.avatar_id.clone(),
            }),
            _ => Err(SessionError::NegotiationFailed(
                "stream avatar not available".to_string(),
            )),
        }
    }

    /// Legacy profile: have the avatar speak `text`. Returns whether the backend accepted it.
    pub async fn legacy_speak(&self, text: &str) -> bool {
        let result = self
            .http
            .post(self.url("/hedra/speak"))
            .json(&SpeakRequest {
                text: text.to_string(),
            })
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Failed to send text to stream avatar: {}", e);
                false
            }
        }
    }

    /// Legacy profile: close the avatar stream. Returns whether the backend accepted it.
    pub async fn legacy_disconnect(&self) -> bool {
        match self.http.post(self.url("/hedra/disconnect")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Failed to stop stream avatar: {}", e);
                false
            }
        }
    }

    /// Backend liveness and which upstream services it has configured
    pub async fn health(&self) -> SessionResult<HealthReport> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| SessionError::NetworkError(format!("Request failed: {e}")))?;

        let response = Self::require_success(response).await?;
        response
            .json()
            .await
            .map_err(|e| SessionError::NetworkError(format!("Invalid response body: {e}")))
    }

    async fn require_success(response: Response) -> SessionResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_default();
        warn!("Backend returned HTTP {}: {}", status.as_u16(), detail);

        Err(SessionError::ServerError(status.as_u16()))
    }
}

/// The backend sometimes serialises a missing URL as text
fn is_usable_stream_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && url != "undefined" && url != "null"
}
