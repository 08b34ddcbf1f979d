use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who said a line of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => f.write_str("You"),
            Speaker::Assistant => f.write_str("Avatar"),
        }
    }
}

/// A single displayed line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub speaker: Speaker,
    pub text: String,
    /// When the line was appended
    pub timestamp: DateTime<Utc>,
}

/// Append-only, order-preserving conversation log
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    entries: Vec<LogEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.entries.push(LogEntry {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Record a completed exchange: user line first, then the reply
    pub fn append_exchange(&mut self, transcript: &str, response: &str) {
        self.append(Speaker::User, transcript);
        self.append(Speaker::Assistant, response);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
