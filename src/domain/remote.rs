//! Resources as the payments API returns them, and the payloads it accepts
//! when creating them.

use super::bank_account::BankAccountType;
use super::credit::CreditStatus;
use super::money::MinorUnits;
use super::resource::ResourceUri;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to another resource embedded in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRef {
    pub uri: ResourceUri,
}

impl From<ResourceUri> for RemoteRef {
    fn from(uri: ResourceUri) -> Self {
        Self { uri }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marketplace {
    pub uri: ResourceUri,
    pub id: String,
    /// Funds available to cover outgoing credits.
    pub in_escrow: MinorUnits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBankAccount {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub account_number: String,
    pub name: String,
    pub routing_number: String,
    #[serde(default)]
    pub bank_name: String,
    #[serde(rename = "type")]
    pub account_type: BankAccountType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCard {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub name: Option<String>,
    pub expiration_month: u32,
    pub expiration_year: i32,
    pub last_four: String,
    pub brand: String,
    #[serde(default = "default_true")]
    pub is_valid: bool,
    #[serde(default)]
    pub account: Option<RemoteRef>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCredit {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub amount: MinorUnits,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub appears_on_statement_as: Option<String>,
    pub status: CreditStatus,
    pub bank_account: RemoteRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDebit {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub amount: MinorUnits,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub appears_on_statement_as: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub account: Option<RemoteRef>,
    #[serde(default)]
    pub source: Option<RemoteRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRefund {
    pub uri: ResourceUri,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub amount: MinorUnits,
    #[serde(default)]
    pub description: Option<String>,
    pub debit: RemoteRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRemoteAccount {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRemoteBankAccount {
    pub routing_number: String,
    pub account_number: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: BankAccountType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRemoteCredit {
    pub amount: MinorUnits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appears_on_statement_as: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRemoteDebit {
    pub amount: MinorUnits,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appears_on_statement_as: Option<String>,
    pub source_uri: ResourceUri,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRemoteRefund {
    /// `None` refunds the full debit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<MinorUnits>,
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_deserialization() {
        let json = r#"{
            "uri": "/v1/credits/CR1",
            "id": "CR1",
            "created_at": "2013-05-01T10:00:00Z",
            "amount": 6000,
            "description": "May payout",
            "status": "paid",
            "bank_account": {"uri": "/v1/bank_accounts/BA1", "name": "dan carter"},
            "state": "cleared"
        }"#;

        let credit: RemoteCredit = serde_json::from_str(json).unwrap();
        assert_eq!(credit.amount, MinorUnits(6000));
        assert_eq!(credit.status, CreditStatus::Paid);
        assert_eq!(credit.bank_account.uri.as_str(), "/v1/bank_accounts/BA1");
        assert_eq!(credit.appears_on_statement_as, None);
    }

    #[test]
    fn test_new_credit_omits_empty_fields() {
        let credit = NewRemoteCredit {
            amount: MinorUnits(100),
            description: None,
            appears_on_statement_as: None,
        };
        assert_eq!(serde_json::to_string(&credit).unwrap(), r#"{"amount":100}"#);
    }

    #[test]
    fn test_bank_account_type_field_name() {
        let bank_account = NewRemoteBankAccount {
            routing_number: "321174851".to_string(),
            account_number: "123123123".to_string(),
            name: "dan carter".to_string(),
            account_type: BankAccountType::Savings,
        };
        let json = serde_json::to_value(&bank_account).unwrap();
        assert_eq!(json["type"], "savings");
    }
}
