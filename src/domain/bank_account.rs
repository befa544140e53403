use super::remote::{NewRemoteBankAccount, RemoteBankAccount};
use super::resource::{Mirrored, ResourceKind, ResourceUri};
use super::user::UserId;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankAccountType {
    Checking,
    Savings,
}

impl BankAccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BankAccountType::Checking => "checking",
            BankAccountType::Savings => "savings",
        }
    }
}

impl fmt::Display for BankAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BankAccountType {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "checking" => Ok(BankAccountType::Checking),
            "savings" => Ok(BankAccountType::Savings),
            other => Err(PaymentError::ValidationError(format!(
                "Select a valid choice. {} is not one of the available choices.",
                other
            ))),
        }
    }
}

/// A bank account not yet known to the payments API.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBankAccount {
    pub user_id: Option<UserId>,
    pub name: String,
    pub account_number: String,
    pub routing_number: String,
    pub account_type: BankAccountType,
}

impl NewBankAccount {
    /// Only the fields the API accepts when creating a bank account.
    pub fn creation_payload(&self) -> NewRemoteBankAccount {
        NewRemoteBankAccount {
            routing_number: self.routing_number.clone(),
            account_number: self.account_number.clone(),
            name: self.name.clone(),
            account_type: self.account_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<UserId>,
    pub account_number: String,
    pub name: String,
    pub routing_number: String,
    pub bank_name: String,
    pub account_type: BankAccountType,
}

impl BankAccount {
    pub fn from_remote(remote: &RemoteBankAccount, user_id: Option<UserId>) -> Self {
        let mut bank_account = Self {
            uri: remote.uri.clone(),
            id: String::new(),
            created_at: remote.created_at,
            user_id,
            account_number: String::new(),
            name: String::new(),
            routing_number: String::new(),
            bank_name: String::new(),
            account_type: remote.account_type,
        };
        bank_account.sync_from(remote);
        bank_account
    }

    /// Copies every field the remote resource shares with the local record.
    /// The owner is local-only and left untouched.
    pub fn sync_from(&mut self, remote: &RemoteBankAccount) {
        self.id = remote.id.clone();
        self.created_at = remote.created_at;
        self.account_number = remote.account_number.clone();
        self.name = remote.name.clone();
        self.routing_number = remote.routing_number.clone();
        self.bank_name = remote.bank_name.clone();
        self.account_type = remote.account_type;
    }
}

impl Mirrored for BankAccount {
    const KIND: ResourceKind = ResourceKind::BankAccounts;

    fn uri(&self) -> &ResourceUri {
        &self.uri
    }
}

impl fmt::Display for BankAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.user_id {
            Some(user) => write!(f, "{} {} {}", user, self.bank_name, self.account_number),
            None => write!(f, "None {} {}", self.bank_name, self.account_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> RemoteBankAccount {
        RemoteBankAccount {
            uri: ResourceUri::new("/v1/bank_accounts/BA1"),
            id: "BA1".to_string(),
            created_at: Utc::now(),
            account_number: "xxxxx3123".to_string(),
            name: "dan carter".to_string(),
            routing_number: "321174851".to_string(),
            bank_name: "SAN MATEO CREDIT UNION".to_string(),
            account_type: BankAccountType::Savings,
        }
    }

    #[test]
    fn test_sync_keeps_owner() {
        let mut bank_account = BankAccount::from_remote(&remote(), Some(UserId(7)));
        let mut changed = remote();
        changed.bank_name = "RENAMED BANK".to_string();
        changed.account_type = BankAccountType::Checking;

        bank_account.sync_from(&changed);

        assert_eq!(bank_account.bank_name, "RENAMED BANK");
        assert_eq!(bank_account.account_type, BankAccountType::Checking);
        assert_eq!(bank_account.user_id, Some(UserId(7)));
    }

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("savings".parse::<BankAccountType>().unwrap(), BankAccountType::Savings);
        assert!(matches!(
            "brokerage".parse::<BankAccountType>(),
            Err(PaymentError::ValidationError(_))
        ));
    }
}
