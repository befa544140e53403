use super::remote::RemoteCard;
use super::resource::{Mirrored, ResourceKind, ResourceUri};
use super::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tokenized card attached to a user's remote account.
///
/// Card numbers never reach this crate: a card is created from a token URI
/// obtained out-of-band, so a record cannot be recreated from its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
    pub name: String,
    pub expiration_month: u32,
    pub expiration_year: i32,
    pub last_four: String,
    pub brand: String,
}

impl Card {
    pub fn from_remote(remote: &RemoteCard, user_id: UserId) -> Self {
        let mut card = Self {
            uri: remote.uri.clone(),
            id: String::new(),
            created_at: remote.created_at,
            user_id,
            name: String::new(),
            expiration_month: 0,
            expiration_year: 0,
            last_four: String::new(),
            brand: String::new(),
        };
        card.sync_from(remote);
        card
    }

    pub fn sync_from(&mut self, remote: &RemoteCard) {
        self.id = remote.id.clone();
        self.created_at = remote.created_at;
        self.name = remote.name.clone().unwrap_or_default();
        self.expiration_month = remote.expiration_month;
        self.expiration_year = remote.expiration_year;
        self.last_four = remote.last_four.clone();
        self.brand = remote.brand.clone();
    }
}

impl Mirrored for Card {
    const KIND: ResourceKind = ResourceKind::Cards;

    fn uri(&self) -> &ResourceUri {
        &self.uri
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.user_id, self.brand, self.last_four)
    }
}
