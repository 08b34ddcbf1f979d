use crate::config::CaptureConfig;
use crate::error::SessionResult;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Constraints requested when opening an input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Preferred sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (1 = mono)
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Frame size for sources that produce frames themselves
    pub frame_ms: u64,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
            frame_ms: 100,
        }
    }
}

impl From<&CaptureConfig> for CaptureConstraints {
    fn from(cfg: &CaptureConfig) -> Self {
        Self {
            sample_rate: cfg.sample_rate,
            channels: cfg.channels,
            echo_cancellation: cfg.echo_cancellation,
            noise_suppression: cfg.noise_suppression,
            frame_ms: cfg.frame_ms,
        }
    }
}

/// An opened input device
///
/// Implementations:
/// - `WavFileBackend`: replays a WAV file (CLI, batch use)
/// - `ChannelBackend`: frames pushed by the host application
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that yields frames until the backend stops
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device. Safe to call more than once.
    async fn stop(&mut self) -> SessionResult<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Grants access to an input device, the way a permission prompt would
#[async_trait::async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Open a device honouring `constraints`
    ///
    /// Fails with `PermissionDenied` or `DeviceUnavailable`
    async fn open(&self, constraints: &CaptureConstraints)
        -> SessionResult<Box<dyn CaptureBackend>>;

    /// Check that access would be granted, without holding the device
    async fn check_permission(&self) -> SessionResult<()> {
        Ok(())
    }
}
