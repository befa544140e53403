use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a user in the host user-management subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The slice of a host user this crate needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

impl User {
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            username: username.into(),
        }
    }
}
