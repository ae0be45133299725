use std::fmt;

use uuid::Uuid;

/// Correlation id minted for one subscriber registration.
///
/// A handle that unsubscribes and comes back gets a fresh id, so log lines
/// name the registration that delivered a value, not just the subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubId(String);

impl SubId {
    pub fn new() -> Self {
        let id = Uuid::new_v4().as_hyphenated().to_string();
        // first uuid segment is enough to tell registrations apart
        Self(id[..8].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
