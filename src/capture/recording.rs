use super::backend::AudioFrame;
use crate::error::{SessionError, SessionResult};
use std::io::Cursor;

/// A captured utterance, packaged for upload
///
/// Owned by the capture unit until it is handed to the backend client and
/// dropped once the upload settles.
#[derive(Debug, Clone)]
pub struct Recording {
    /// WAV container bytes (16-bit PCM)
    pub wav: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Number of interleaved samples
    pub sample_count: usize,
}

impl Recording {
    /// Package frames into a WAV buffer
    ///
    /// Returns `EmptyCapture` when the frames carry no samples at all.
    pub fn from_frames(frames: &[AudioFrame]) -> SessionResult<Self> {
        let sample_count: usize = frames.iter().map(|f| f.samples.len()).sum();
        let first = match frames.iter().find(|f| !f.samples.is_empty()) {
            Some(frame) if sample_count > 0 => frame,
            _ => return Err(SessionError::EmptyCapture),
        };

        let spec = hound::WavSpec {
            channels: first.channels,
            sample_rate: first.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + sample_count * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for frame in frames {
                for &sample in &frame.samples {
                    writer.write_sample(sample)?;
                }
            }
            writer.finalize()?;
        }

        Ok(Self {
            wav: cursor.into_inner(),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            sample_count,
        })
    }

    /// Duration of the recording in seconds
    pub fn duration_secs(&self) -> f64 {
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels.max(1) as f64)
    }
}

/// Bring a frame to the requested rate and channel layout
pub(crate) fn conform_frame(frame: AudioFrame, target_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    if processed.sample_rate != target_rate {
        processed = downsample_frame(processed, target_rate);
    }

    if processed.channels != target_channels && target_channels == 1 {
        processed = stereo_to_mono(processed);
    }

    processed
}

/// Downsample by decimation; frames at or below the target rate pass through
fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if target_rate == 0 || frame.sample_rate <= target_rate {
        return frame;
    }

    let ratio = frame.sample_rate / target_rate;
    if ratio <= 1 {
        return frame;
    }

    let channels = frame.channels.max(1) as usize;
    let downsampled: Vec<i16> = frame
        .samples
        .chunks(channels)
        .step_by(ratio as usize)
        .flatten()
        .copied()
        .collect();

    AudioFrame {
        samples: downsampled,
        sample_rate: frame.sample_rate / ratio,
        channels: frame.channels,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Average stereo pairs into mono
fn stereo_to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels != 2 {
        return frame;
    }

    let samples = frame
        .samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect();

    AudioFrame {
        samples,
        sample_rate: frame.sample_rate,
        channels: 1,
        timestamp_ms: frame.timestamp_ms,
    }
}
