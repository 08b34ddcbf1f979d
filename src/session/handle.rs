use super::event::SessionEvent;
use super::id::SessionId;
use super::log::{ConversationLog, LogEntry};
use crate::presentation::View;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};

#[derive(Debug)]
pub(crate) enum Command {
    Press,
    Release,
    ConnectLive,
    Disconnect,
    Shutdown,
}

/// Command plus the acknowledgement sent once the controller has handled it
pub(crate) type Request = (Command, oneshot::Sender<()>);

/// Cheap, cloneable access to a running session
///
/// Every command resolves once the controller has handled it. Work the
/// command starts in the background (upload, negotiation, playback) is
/// observed through [`SessionHandle::events`] and [`SessionHandle::view`].
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) commands: mpsc::Sender<Request>,
    pub(crate) view: watch::Receiver<View>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
    pub(crate) log: Arc<Mutex<ConversationLog>>,
    pub(crate) session_id: SessionId,
}

impl SessionHandle {
    /// Push-to-talk pressed
    pub async fn press(&self) -> Result<()> {
        self.send(Command::Press).await
    }

    /// Push-to-talk released
    pub async fn release(&self) -> Result<()> {
        self.send(Command::Release).await
    }

    /// Start the live avatar connection now instead of on the first press
    pub async fn connect_live(&self) -> Result<()> {
        self.send(Command::ConnectLive).await
    }

    /// Tear down the live avatar connection
    pub async fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect).await
    }

    /// Stop the controller, releasing the device and the live connection
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    pub fn view(&self) -> watch::Receiver<View> {
        self.view.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the conversation so far
    pub async fn conversation(&self) -> Vec<LogEntry> {
        self.log.lock().await.entries().to_vec()
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    async fn send(&self, command: Command) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send((command, ack_tx))
            .await
            .map_err(|_| anyhow!("Session controller has stopped"))?;
        ack_rx
            .await
            .context("Session controller stopped before handling the command")
    }
}
