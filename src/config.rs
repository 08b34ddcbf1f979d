use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable prefix, e.g. `VOICE_AVATAR__BACKEND__BASE_URL`
pub const ENV_PREFIX: &str = "VOICE_AVATAR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub capture: CaptureConfig,
    pub live: LiveConfig,
    pub playback: PlaybackConfig,
}

/// Which family of avatar endpoints the backend speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProfile {
    /// `/create-hedra-room` negotiation followed by a real-time room connection
    Room,
    /// `/hedra/connect`, `/hedra/speak`, `/hedra/disconnect` with a signaling socket
    Legacy,
}

impl Default for BackendProfile {
    fn default() -> Self {
        BackendProfile::Room
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub profile: BackendProfile,
    /// Per-request timeout; `None` keeps the HTTP client's default
    pub request_timeout_secs: Option<u64>,
    /// Avatar requested by the legacy profile
    pub avatar_id: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            profile: BackendProfile::Room,
            request_timeout_secs: None,
            avatar_id: "default-avatar-id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Size of the frames produced by file-backed capture
    pub frame_ms: u64,
}

impl Default for CaptureConfig {
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

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub enabled: bool,
    /// Give up on room negotiation + connect after this long and stay on audio
    pub negotiation_timeout_secs: u64,
    /// Identity markers added to the built-in agent markers
    pub agent_markers: Vec<String>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            negotiation_timeout_secs: 15,
            agent_markers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub output_dir: String,
    /// Hold each reply for its real duration before reporting the end of playback
    pub realtime: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            output_dir: "~/.voice-avatar/replies".to_string(),
            realtime: true,
        }
    }
}

impl PlaybackConfig {
    /// Output directory with `~` and environment variables expanded
    pub fn output_path(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.output_dir)
            .with_context(|| format!("Failed to expand playback path {}", self.output_dir))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

impl Config {
    /// Load from an optional config file layered with environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to build configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }
}
