//! Voice-processing backend client
//!
//! - POST /process-voice - upload a recording, get transcript + reply
//! - POST /create-hedra-room - negotiate live avatar room credentials
//! - POST /hedra/connect, /hedra/speak, /hedra/disconnect - legacy stream avatar
//! - GET /health - backend status

pub mod client;
pub mod messages;

pub use client::BackendClient;
pub use messages::{Exchange, HealthReport, RoomCredentials};
