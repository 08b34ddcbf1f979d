use super::backend::{AudioFrame, CaptureBackend, CaptureConstraints, CaptureProvider};
use super::recording::Recording;
use crate::error::{SessionError, SessionResult};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Push-to-talk capture: `begin` on press, `end` on release
///
/// Holds at most one open device. The device is released on every exit path:
/// a failed start, `end`, or dropping the unit mid-capture.
pub struct CaptureUnit {
    provider: Arc<dyn CaptureProvider>,
    constraints: CaptureConstraints,
    active: Option<ActiveCapture>,
}

struct ActiveCapture {
    backend: Box<dyn CaptureBackend>,
    collector: JoinHandle<Vec<AudioFrame>>,
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        self.collector.abort();
    }
}

impl CaptureUnit {
    pub fn new(provider: Arc<dyn CaptureProvider>, constraints: CaptureConstraints) -> Self {
        Self {
            provider,
            constraints,
            active: None,
        }
    }

    /// Whether a capture is currently open
    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Ask the provider whether capture would be allowed
    pub async fn probe_permission(&self) -> SessionResult<()> {
        self.provider.check_permission().await
    }

    /// Start capturing
    ///
    /// A second call while capturing is ignored.
    pub async fn begin(&mut self) -> SessionResult<()> {
        if self.active.is_some() {
            warn!("Capture already started");
            return Ok(());
        }

        let mut backend = self.provider.open(&self.constraints).await?;

        let mut frames_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to start {} capture: {}", backend.name(), e);
                if let Err(stop_err) = backend.stop().await {
                    warn!("Failed to release {}: {}", backend.name(), stop_err);
                }
                return Err(e);
            }
        };

        info!("Capture started on {}", backend.name());

        let collector = tokio::spawn(async move {
            let mut frames = Vec::new();
            while let Some(frame) = frames_rx.recv().await {
                frames.push(frame);
            }
            frames
        });

        self.active = Some(ActiveCapture { backend, collector });
        Ok(())
    }

    /// Stop capturing and package what was heard
    ///
    /// Fails with `EmptyCapture` when nothing was captured (including when no
    /// capture was open).
    pub async fn end(&mut self) -> SessionResult<Recording> {
        let Some(mut active) = self.active.take() else {
            return Err(SessionError::EmptyCapture);
        };

        if let Err(e) = active.backend.stop().await {
            warn!("Failed to release {}: {}", active.backend.name(), e);
        }

        let frames = match (&mut active.collector).await {
            Ok(frames) => frames,
            Err(e) => {
                error!("Capture collector failed: {}", e);
                Vec::new()
            }
        };

        let recording = Recording::from_frames(&frames)?;
        info!(
            "Capture finished: {:.1}s, {} samples",
            recording.duration_secs(),
            recording.sample_count
        );
        Ok(recording)
    }
}
