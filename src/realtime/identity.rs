//! Deciding which participant is the avatar agent.
//!
//! A declared role wins. Without one we fall back to looking for a known
//! marker inside the identity string. That fallback is a heuristic: a user
//! whose identity happens to contain a marker is misclassified, so servers
//! should set the role in participant metadata.

use super::events::{Participant, ParticipantRole};

/// Identity substrings that mark the avatar agent (case-sensitive)
pub const AGENT_IDENTITY_MARKERS: &[&str] = &["agent", "hedra", "avatar"];

#[derive(Debug, Clone, Default)]
pub struct AgentMatcher {
    extra_markers: Vec<String>,
}

impl AgentMatcher {
    pub fn new(extra_markers: Vec<String>) -> Self {
        Self {
            extra_markers: extra_markers
                .into_iter()
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn is_agent(&self, participant: &Participant) -> bool {
        match participant.role {
            Some(ParticipantRole::Agent) => true,
            Some(ParticipantRole::User) => false,
            None => self.matches_marker(&participant.identity),
        }
    }

    fn matches_marker(&self, identity: &str) -> bool {
        AGENT_IDENTITY_MARKERS
            .iter()
            .copied()
            .chain(self.extra_markers.iter().map(String::as_str))
            .any(|marker| identity.contains(marker))
    }
}
