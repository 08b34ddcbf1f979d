//! Microphone capture for push-to-talk
//!
//! Platform input lives behind `CaptureProvider`/`CaptureBackend`; the
//! `CaptureUnit` enforces one open device at a time and packages what it
//! heard as a WAV `Recording`.

pub mod backend;
pub mod channel;
pub mod file;
pub mod recording;
pub mod unit;

pub use backend::{AudioFrame, CaptureBackend, CaptureConstraints, CaptureProvider};
pub use channel::{ChannelBackend, ChannelProvider};
pub use file::{WavFileBackend, WavFileProvider};
pub use recording::Recording;
pub use unit::CaptureUnit;
