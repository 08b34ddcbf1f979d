use super::events::RoomEvent;
use crate::backend::RoomCredentials;
use crate::error::SessionResult;
use tokio::sync::mpsc;

/// Real-time media SDK seam
///
/// Implementations:
/// - `LegacyStreamTransport`: backend-hosted avatar stream over a signaling socket
/// - `LiveKitTransport` (feature `livekit`): room joined with negotiated credentials
#[async_trait::async_trait]
pub trait RoomTransport: Send + Sync {
    /// Join the live session
    ///
    /// Returns the event stream for this connection. Fails with `ConnectionFailed`,
    /// including while a previous connection is still open. A connection the
    /// remote side dropped is released before its `Disconnected` is delivered.
    async fn connect(
        &self,
        credentials: &RoomCredentials,
    ) -> SessionResult<mpsc::Receiver<RoomEvent>>;

    /// Leave the live session. A no-op when not connected.
    async fn disconnect(&self) -> SessionResult<()>;

    /// Hand the response text to the avatar
    ///
    /// Room agents listen to the conversation themselves, so by default
    /// there is nothing to send.
    async fn relay_response(&self, _text: &str) -> SessionResult<()> {
        Ok(())
    }

    /// Transport name for logging
    fn name(&self) -> &str;
}
