use super::decode::DecodedAudio;
use crate::error::{SessionError, SessionResult};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Audio output device seam
///
/// Implementations:
/// - `WavFileSink`: writes each clip to disk
/// - `NullSink`: discards
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    /// Play a clip; resolves when playback is over
    async fn play(&self, audio: DecodedAudio) -> SessionResult<()>;
}

/// Writes replies as `<prefix>-reply-NNN.wav`
///
/// With `realtime` set, `play` resolves only after the clip's duration has
/// elapsed, like a speaker would.
pub struct WavFileSink {
    dir: PathBuf,
    prefix: String,
    counter: AtomicU32,
    realtime: bool,
}

impl WavFileSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, realtime: bool) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            counter: AtomicU32::new(0),
            realtime,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.dir.join(format!("{}-reply-{:03}.wav", self.prefix, n))
    }
}

fn write_wav(path: &Path, audio: &DecodedAudio) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &audio.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

#[async_trait::async_trait]
impl AudioSink for WavFileSink {
    async fn play(&self, audio: DecodedAudio) -> SessionResult<()> {
        let path = self.next_path();
        let duration = audio.duration_secs();

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| SessionError::PlaybackError(format!("{}: {}", self.dir.display(), e)))?;

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_wav(&target, &audio))
            .await
            .map_err(|e| SessionError::PlaybackError(e.to_string()))?
            .map_err(|e| SessionError::PlaybackError(e.to_string()))?;

        info!("Reply audio written: {} ({:.1}s)", path.display(), duration);

        if self.realtime {
            tokio::time::sleep(Duration::from_secs_f64(duration)).await;
        }
        Ok(())
    }
}

/// Discards every clip
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait::async_trait]
impl AudioSink for NullSink {
    async fn play(&self, audio: DecodedAudio) -> SessionResult<()> {
        debug!("Discarding {:.1}s of reply audio", audio.duration_secs());
        Ok(())
    }
}
