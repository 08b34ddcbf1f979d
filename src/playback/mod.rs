//! Response audio playback

mod decode;
mod sink;

pub use decode::{decode_audio, decode_base64, DecodedAudio};
pub use sink::{AudioSink, NullSink, WavFileSink};

use crate::error::{SessionError, SessionResult};
use tracing::info;

/// Plays the audio attached to an exchange
#[async_trait::async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play base64-encoded audio; resolves when playback ends
    ///
    /// Any failure is a `PlaybackError`.
    async fn play(&self, audio_base64: &str) -> SessionResult<()>;
}

/// Decodes with symphonia and hands the PCM to a sink
pub struct DecodingPlayer<S> {
    sink: S,
}

impl<S: AudioSink> DecodingPlayer<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[async_trait::async_trait]
impl<S: AudioSink> AudioPlayer for DecodingPlayer<S> {
    async fn play(&self, audio_base64: &str) -> SessionResult<()> {
        let bytes = decode_base64(audio_base64)?;
        info!("Decoding {} bytes of reply audio", bytes.len());

        let audio = tokio::task::spawn_blocking(move || decode_audio(bytes))
            .await
            .map_err(|e| SessionError::PlaybackError(e.to_string()))??;

        self.sink.play(audio).await
    }
}
