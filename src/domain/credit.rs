use super::money::Amount;
use super::remote::RemoteCredit;
use super::resource::{Mirrored, ResourceKind, ResourceUri};
use super::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Settlement state reported by the API. Statuses this crate does not know
/// are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CreditStatus {
    Scheduled,
    Pending,
    Paid,
    Failed,
    Other(String),
}

impl CreditStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CreditStatus::Scheduled => "scheduled",
            CreditStatus::Pending => "pending",
            CreditStatus::Paid => "paid",
            CreditStatus::Failed => "failed",
            CreditStatus::Other(status) => status,
        }
    }
}

impl From<String> for CreditStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "scheduled" => CreditStatus::Scheduled,
            "pending" => CreditStatus::Pending,
            "paid" => CreditStatus::Paid,
            "failed" => CreditStatus::Failed,
            _ => CreditStatus::Other(status),
        }
    }
}

impl From<CreditStatus> for String {
    fn from(status: CreditStatus) -> Self {
        match status {
            CreditStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CreditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payout from the marketplace to a bank account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<UserId>,
    pub bank_account: ResourceUri,
    pub amount: Amount,
    pub description: Option<String>,
    pub statement_descriptor: Option<String>,
    pub status: CreditStatus,
}

impl Credit {
    pub fn from_remote(remote: &RemoteCredit, bank_account: ResourceUri, user_id: Option<UserId>) -> Self {
        let mut credit = Self {
            uri: remote.uri.clone(),
            id: String::new(),
            created_at: remote.created_at,
            user_id,
            bank_account,
            amount: Amount::from_minor_units(remote.amount),
            description: None,
            statement_descriptor: None,
            status: CreditStatus::Scheduled,
        };
        credit.sync_from(remote);
        credit
    }

    /// Refreshes scalar fields. The bank account reference is fixed at
    /// creation and never rewritten.
    pub fn sync_from(&mut self, remote: &RemoteCredit) {
        self.id = remote.id.clone();
        self.created_at = remote.created_at;
        self.amount = Amount::from_minor_units(remote.amount);
        self.description = remote.description.clone();
        if remote.appears_on_statement_as.is_some() {
            self.statement_descriptor = remote.appears_on_statement_as.clone();
        }
        self.status = remote.status.clone();
    }
}

impl Mirrored for Credit {
    const KIND: ResourceKind = ResourceKind::Credits;

    fn uri(&self) -> &ResourceUri {
        &self.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::MinorUnits;
    use crate::domain::remote::RemoteRef;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_stored_in_currency_units() {
        let remote = RemoteCredit {
            uri: ResourceUri::new("/v1/credits/CR1"),
            id: "CR1".to_string(),
            created_at: Utc::now(),
            amount: MinorUnits(12345),
            description: Some("payout".to_string()),
            appears_on_statement_as: None,
            status: CreditStatus::Pending,
            bank_account: RemoteRef::from(ResourceUri::new("/v1/bank_accounts/BA1")),
        };

        let mut credit = Credit::from_remote(&remote, ResourceUri::new("/v1/bank_accounts/BA1"), None);
        credit.statement_descriptor = Some("ACME".to_string());
        credit.sync_from(&remote);

        assert_eq!(credit.amount.value(), dec!(123.45));
        assert_eq!(credit.amount.to_minor_units().unwrap(), MinorUnits(12345));
        assert_eq!(credit.statement_descriptor.as_deref(), Some("ACME"));
        assert_eq!(credit.status, CreditStatus::Pending);
    }

    #[test]
    fn test_unrecognised_status_string_survives() {
        let status: CreditStatus = serde_json::from_str("\"reversed\"").unwrap();
        assert_eq!(status, CreditStatus::Other("reversed".to_string()));
        assert_eq!(status.to_string(), "reversed");
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"reversed\"");

        let paid: CreditStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(paid, CreditStatus::Paid);
        assert_eq!(serde_json::to_string(&paid).unwrap(), "\"paid\"");
    }
}
