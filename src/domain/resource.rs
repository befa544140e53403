use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier the payments API assigns to every resource.
///
/// Reused locally as the primary key of each mirrored record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceUri(String);

impl ResourceUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The URI without its leading API version segment (`/v1`).
    pub fn unversioned(&self) -> &str {
        match self.0.strip_prefix("/v") {
            Some(rest) => match rest.find('/') {
                Some(idx) if rest[..idx].chars().all(|c| c.is_ascii_digit()) => &rest[idx..],
                _ => &self.0,
            },
            None => &self.0,
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for ResourceUri {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

/// The kinds of remote resource mirrored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Accounts,
    BankAccounts,
    Cards,
    Credits,
    Debits,
}

impl ResourceKind {
    /// Dependency order: owners before the records that reference them.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Accounts,
        ResourceKind::BankAccounts,
        ResourceKind::Cards,
        ResourceKind::Credits,
        ResourceKind::Debits,
    ];

    /// Name of the persisted table holding this kind.
    pub fn table(&self) -> &'static str {
        match self {
            ResourceKind::Accounts => "balanced_accounts",
            ResourceKind::BankAccounts => "balanced_bank_accounts",
            ResourceKind::Cards => "balanced_cards",
            ResourceKind::Credits => "balanced_credits",
            ResourceKind::Debits => "balanced_debits",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Accounts => "accounts",
            ResourceKind::BankAccounts => "bank-accounts",
            ResourceKind::Cards => "cards",
            ResourceKind::Credits => "credits",
            ResourceKind::Debits => "debits",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s || kind.name().replace('-', "_") == s)
            .ok_or_else(|| format!("unknown resource kind '{}'", s))
    }
}

/// A local record shadowing a remote resource.
pub trait Mirrored: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: ResourceKind;

    fn uri(&self) -> &ResourceUri;
}
