use super::backend::{AudioFrame, CaptureBackend, CaptureConstraints, CaptureProvider};
use super::recording::conform_frame;
use crate::error::{SessionError, SessionResult};
use hound::WavReader;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::info;

/// Capture backend that replays a WAV file as if it were spoken into the mic
pub struct WavFileBackend {
    path: PathBuf,
    constraints: CaptureConstraints,
    capturing: bool,
}

impl WavFileBackend {
    pub fn new(path: impl AsRef<Path>, constraints: CaptureConstraints) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            constraints,
            capturing: false,
        }
    }

    fn read_frames(&self) -> SessionResult<Vec<AudioFrame>> {
        let reader = WavReader::open(&self.path).map_err(|e| {
            SessionError::DeviceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SessionError::DeviceUnavailable(format!("Failed to read samples: {e}")))?;

        let channels = spec.channels.max(1) as usize;
        let frame_len = ((spec.sample_rate as u64 * self.constraints.frame_ms / 1000) as usize)
            .max(1)
            * channels;

        let frames = samples
            .chunks(frame_len)
            .enumerate()
            .map(|(i, chunk)| {
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate: spec.sample_rate,
                    channels: spec.channels,
                    timestamp_ms: i as u64 * self.constraints.frame_ms,
                };
                conform_frame(frame, self.constraints.sample_rate, self.constraints.channels)
            })
            .collect();

        Ok(frames)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for WavFileBackend {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        let frames = self.read_frames()?;
        info!(
            "Replaying {} ({} frames)",
            self.path.display(),
            frames.len()
        );

        // The whole file fits in the channel, so the sender can go away now
        let (tx, rx) = mpsc::channel(frames.len().max(1));
        for frame in frames {
            tx.try_send(frame)
                .map_err(|e| SessionError::DeviceUnavailable(e.to_string()))?;
        }

        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> SessionResult<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

/// Hands out one queued WAV file per press
#[derive(Default)]
pub struct WavFileProvider {
    queue: Mutex<VecDeque<PathBuf>>,
}

impl WavFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a file for the next `open`
    pub fn enqueue(&self, path: impl Into<PathBuf>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(path.into());
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl CaptureProvider for WavFileProvider {
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> SessionResult<Box<dyn CaptureBackend>> {
        let path = self
            .queue
            .lock()
            .map_err(|_| SessionError::DeviceUnavailable("input queue poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| SessionError::DeviceUnavailable("no input file queued".to_string()))?;

        if !path.exists() {
            return Err(SessionError::DeviceUnavailable(format!(
                "{} does not exist",
                path.display()
            )));
        }

        Ok(Box::new(WavFileBackend::new(path, constraints.clone())))
    }
}
