use super::remote::{NewRemoteAccount, RemoteAccount};
use super::resource::{Mirrored, ResourceKind, ResourceUri};
use super::user::{User, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote marketplace identity of a local user (one per user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
}

impl Account {
    /// Fields sent when creating the remote account for `user`.
    pub fn creation_payload(user: &User) -> NewRemoteAccount {
        NewRemoteAccount {
            name: user.username.clone(),
        }
    }

    pub fn from_remote(remote: &RemoteAccount, user_id: UserId) -> Self {
        Self {
            uri: remote.uri.clone(),
            id: remote.id.clone(),
            created_at: remote.created_at,
            user_id,
        }
    }

    pub fn sync_from(&mut self, remote: &RemoteAccount) {
        self.id = remote.id.clone();
        self.created_at = remote.created_at;
    }
}

impl Mirrored for Account {
    const KIND: ResourceKind = ResourceKind::Accounts;

    fn uri(&self) -> &ResourceUri {
        &self.uri
    }
}
