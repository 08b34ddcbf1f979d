use serde::{Deserialize, Serialize};
use std::fmt;

const ID_LEN: usize = 9;

/// Per-session correlation key sent with every backend request
///
/// Generated once when the controller starts and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh identifier of the form `session_xxxxxxxxx` (lowercase base36)
    pub fn generate() -> Self {
        let mut n = uuid::Uuid::new_v4().as_u128();
        let mut suffix = String::with_capacity(ID_LEN);
        for _ in 0..ID_LEN {
            let digit = (n % 36) as u32;
            n /= 36;
            suffix.push(std::char::from_digit(digit, 36).unwrap_or('0'));
        }
        Self(format!("session_{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
