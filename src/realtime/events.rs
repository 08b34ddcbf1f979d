use serde::Deserialize;
use std::fmt;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Role a participant declares through signaling metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    /// The avatar agent that renders the reply
    Agent,
    /// A human user
    User,
}

impl ParticipantRole {
    /// Parse participant metadata: either `{"role": "..."}` or the bare role name
    pub fn from_metadata(metadata: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Metadata {
            role: Option<String>,
        }

        let metadata = metadata.trim();
        if metadata.is_empty() {
            return None;
        }

        let role = match serde_json::from_str::<Metadata>(metadata) {
            Ok(parsed) => parsed.role?,
            Err(_) => metadata.to_string(),
        };

        match role.trim().to_ascii_lowercase().as_str() {
            "agent" | "avatar" => Some(ParticipantRole::Agent),
            "user" => Some(ParticipantRole::User),
            _ => None,
        }
    }
}

/// A remote participant as seen by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub identity: String,
    pub role: Option<ParticipantRole>,
}

impl Participant {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            role: None,
        }
    }

    pub fn with_metadata(identity: impl Into<String>, metadata: &str) -> Self {
        Self {
            identity: identity.into(),
            role: ParticipantRole::from_metadata(metadata),
        }
    }

    pub fn with_role(identity: impl Into<String>, role: ParticipantRole) -> Self {
        Self {
            identity: identity.into(),
            role: Some(role),
        }
    }
}

/// Why a live connection went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// We asked for it
    ClientInitiated,
    /// The server or room closed it
    Remote(String),
    /// Signaling failed underneath us
    TransportError(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClientInitiated => f.write_str("client initiated"),
            DisconnectReason::Remote(detail) => write!(f, "remote: {detail}"),
            DisconnectReason::TransportError(detail) => write!(f, "transport error: {detail}"),
        }
    }
}

/// Lifecycle events of a live connection, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    Connected,
    Disconnected(DisconnectReason),
    ParticipantJoined(Participant),
    /// A participant left; their tracks are gone without a separate end event
    ParticipantLeft(Participant),
    TrackReady { kind: TrackKind, owner: Participant },
    TrackEnded { kind: TrackKind, owner: Participant },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_json_metadata() {
        assert_eq!(
            ParticipantRole::from_metadata(r#"{"role":"agent","voice":"x"}"#),
            Some(ParticipantRole::Agent)
        );
        assert_eq!(
            ParticipantRole::from_metadata(r#"{"role":"user"}"#),
            Some(ParticipantRole::User)
        );
        assert_eq!(ParticipantRole::from_metadata(r#"{"voice":"x"}"#), None);
    }

    #[test]
    fn test_role_from_plain_metadata() {
        assert_eq!(
            ParticipantRole::from_metadata("Avatar"),
            Some(ParticipantRole::Agent)
        );
        assert_eq!(ParticipantRole::from_metadata(""), None);
        assert_eq!(ParticipantRole::from_metadata("moderator"), None);
    }
}
