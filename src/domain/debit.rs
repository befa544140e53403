use super::money::Amount;
use super::remote::RemoteDebit;
use super::resource::{Mirrored, ResourceKind, ResourceUri};
use super::user::UserId;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the funds of a debit come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "uri")]
pub enum FundingSource {
    Card(ResourceUri),
    BankAccount(ResourceUri),
}

impl FundingSource {
    /// Picks the single funding source out of the two optional references.
    ///
    /// Returns `Ok(None)` when neither is set; the caller decides on a
    /// fallback.
    pub fn from_parts(card: Option<ResourceUri>, bank_account: Option<ResourceUri>) -> Result<Option<Self>> {
        match (card, bank_account) {
            (Some(_), Some(_)) => Err(PaymentError::ValidationError(
                "Cannot include both \"card\" and \"bank_account\"".to_string(),
            )),
            (Some(card), None) => Ok(Some(FundingSource::Card(card))),
            (None, Some(bank_account)) => Ok(Some(FundingSource::BankAccount(bank_account))),
            (None, None) => Ok(None),
        }
    }

    /// Classifies a source URI returned by the API.
    pub fn from_uri(uri: ResourceUri) -> Self {
        if uri.as_str().contains("/bank_accounts/") {
            FundingSource::BankAccount(uri)
        } else {
            FundingSource::Card(uri)
        }
    }

    pub fn uri(&self) -> &ResourceUri {
        match self {
            FundingSource::Card(uri) | FundingSource::BankAccount(uri) => uri,
        }
    }
}

/// A charge taken from a card or bank account into the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debit {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
    pub amount: Amount,
    pub description: String,
    pub statement_descriptor: Option<String>,
    pub source: FundingSource,
}

impl Debit {
    pub fn from_remote(remote: &RemoteDebit, user_id: UserId, source: FundingSource) -> Self {
        let mut debit = Self {
            uri: remote.uri.clone(),
            id: String::new(),
            created_at: remote.created_at,
            user_id,
            amount: Amount::from_minor_units(remote.amount),
            description: String::new(),
            statement_descriptor: None,
            source,
        };
        debit.sync_from(remote);
        debit
    }

    pub fn sync_from(&mut self, remote: &RemoteDebit) {
        self.id = remote.id.clone();
        self.created_at = remote.created_at;
        self.amount = Amount::from_minor_units(remote.amount);
        self.description = remote.description.clone().unwrap_or_default();
        if remote.appears_on_statement_as.is_some() {
            self.statement_descriptor = remote.appears_on_statement_as.clone();
        }
    }
}

impl Mirrored for Debit {
    const KIND: ResourceKind = ResourceKind::Debits;

    fn uri(&self) -> &ResourceUri {
        &self.uri
    }
}

/// Longest statement descriptor the API accepts.
pub const STATEMENT_DESCRIPTOR_MAX_LEN: usize = 12;

pub fn validate_statement_descriptor(descriptor: Option<&str>) -> Result<()> {
    match descriptor {
        Some(d) if d.chars().count() > STATEMENT_DESCRIPTOR_MAX_LEN => {
            Err(PaymentError::ValidationError(format!(
                "Ensure the statement descriptor has at most {} characters (it has {}).",
                STATEMENT_DESCRIPTOR_MAX_LEN,
                d.chars().count()
            )))
        }
        _ => Ok(()),
    }
}
