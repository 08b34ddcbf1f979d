pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
pub mod playback;
pub mod presentation;
pub mod realtime;
pub mod session;

pub use backend::{BackendClient, Exchange, HealthReport, RoomCredentials};
pub use capture::{
    AudioFrame, CaptureBackend, CaptureConstraints, CaptureProvider, CaptureUnit,
    ChannelProvider, Recording, WavFileProvider,
};
pub use config::Config;
pub use error::{SessionError, SessionResult};
pub use playback::{AudioPlayer, AudioSink, DecodingPlayer, NullSink, WavFileSink};
pub use presentation::{PresentationMode, View};
pub use realtime::{probe_transport, ConnectionPhase, RoomEvent, RoomTransport};
pub use session::{LogEntry, SessionController, SessionEvent, SessionHandle, SessionId, Speaker};
