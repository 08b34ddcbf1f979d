use super::backend::{AudioFrame, CaptureBackend, CaptureConstraints, CaptureProvider};
use crate::error::{SessionError, SessionResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

type SharedSender = Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>;

/// Capture source fed by the host application (e.g. a platform audio callback)
///
/// `open` fails with `PermissionDenied` until the host grants access.
#[derive(Clone)]
pub struct ChannelProvider {
    sender: SharedSender,
    granted: Arc<AtomicBool>,
    buffer_frames: usize,
}

impl ChannelProvider {
    pub fn new(buffer_frames: usize) -> Self {
        Self {
            sender: Arc::new(Mutex::new(None)),
            granted: Arc::new(AtomicBool::new(true)),
            buffer_frames: buffer_frames.max(1),
        }
    }

    /// Grant or revoke microphone permission
    pub fn set_permission(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    /// Push a frame into the active capture
    ///
    /// Returns false when nothing is capturing; the frame is dropped.
    pub fn push(&self, frame: AudioFrame) -> bool {
        let sender = match self.sender.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        match sender {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => {
                debug!("Dropping frame, no capture active");
                false
            }
        }
    }

    /// Whether a capture currently holds the device
    pub fn is_open(&self) -> bool {
        self.sender.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl CaptureProvider for ChannelProvider {
    async fn open(
        &self,
        _constraints: &CaptureConstraints,
    ) -> SessionResult<Box<dyn CaptureBackend>> {
        self.check_permission().await?;
        Ok(Box::new(ChannelBackend {
            sender: Arc::clone(&self.sender),
            buffer_frames: self.buffer_frames,
            capturing: false,
        }))
    }

    async fn check_permission(&self) -> SessionResult<()> {
        if self.granted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SessionError::PermissionDenied(
                "host denied microphone access".to_string(),
            ))
        }
    }
}

/// Device handle returned by `ChannelProvider`
pub struct ChannelBackend {
    sender: SharedSender,
    buffer_frames: usize,
    capturing: bool,
}

#[async_trait::async_trait]
impl CaptureBackend for ChannelBackend {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(self.buffer_frames);
        let mut slot = self
            .sender
            .lock()
            .map_err(|_| SessionError::DeviceUnavailable("capture slot poisoned".to_string()))?;
        if slot.is_some() {
            return Err(SessionError::DeviceUnavailable(
                "device already in use".to_string(),
            ));
        }
        *slot = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> SessionResult<()> {
        if self.capturing {
            if let Ok(mut slot) = self.sender.lock() {
                slot.take();
            }
            self.capturing = false;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "channel"
    }
}

impl Drop for ChannelBackend {
    fn drop(&mut self) {
        if self.capturing {
            if let Ok(mut slot) = self.sender.lock() {
                slot.take();
            }
        }
    }
}
