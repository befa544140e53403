use crate::domain::money::MinorUnits;
use crate::domain::ports::{MirrorStore, MirrorStores, PaymentGateway};
use crate::domain::remote::{
    Marketplace, NewRemoteAccount, NewRemoteBankAccount, NewRemoteCredit, NewRemoteDebit,
    NewRemoteRefund, RemoteAccount, RemoteBankAccount, RemoteCard, RemoteCredit, RemoteDebit,
    RemoteRef, RemoteRefund,
};
use crate::domain::credit::CreditStatus;
use crate::domain::resource::{Mirrored, ResourceUri};
use crate::error::{RemoteError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory table of mirrored records.
///
/// Uses `Arc<RwLock<HashMap<ResourceUri, T>>>` so clones share the same rows.
/// Ideal for testing or for runs where persistence is not required.
#[derive(Clone)]
pub struct InMemoryStore<T> {
    records: Arc<RwLock<HashMap<ResourceUri, T>>>,
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T> InMemoryStore<T> {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T: Mirrored> MirrorStore<T> for InMemoryStore<T> {
    async fn store(&self, record: T) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.uri().clone(), record);
        Ok(())
    }

    async fn get(&self, uri: &ResourceUri) -> Result<Option<T>> {
        let records = self.records.read().await;
        Ok(records.get(uri).cloned())
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        let records = self.records.read().await;
        let mut all: Vec<T> = records.values().cloned().collect();
        all.sort_by(|a, b| a.uri().cmp(b.uri()));
        Ok(all)
    }

    async fn remove(&self, uri: &ResourceUri) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(uri);
        Ok(())
    }
}

/// Fresh in-memory tables for every mirrored kind.
pub fn in_memory_stores() -> MirrorStores {
    MirrorStores {
        accounts: Arc::new(InMemoryStore::new()),
        bank_accounts: Arc::new(InMemoryStore::new()),
        cards: Arc::new(InMemoryStore::new()),
        credits: Arc::new(InMemoryStore::new()),
        debits: Arc::new(InMemoryStore::new()),
    }
}

const MARKETPLACE_URI: &str = "/v1/marketplaces/TEST-MP1";

#[derive(Default)]
struct Ledger {
    next_id: u64,
    escrow: MinorUnits,
    accounts: Vec<RemoteAccount>,
    card_tokens: Vec<RemoteCard>,
    cards: Vec<RemoteCard>,
    bank_accounts: Vec<RemoteBankAccount>,
    credits: Vec<RemoteCredit>,
    debits: Vec<RemoteDebit>,
    refunds: Vec<RemoteRefund>,
    failing_bank_accounts: HashSet<ResourceUri>,
    credit_calls: usize,
    account_creations: usize,
}

impl Ledger {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }
}

fn not_found(uri: &ResourceUri) -> RemoteError {
    RemoteError::new(404, "not-found", format!("{} was not found", uri))
}

fn bad_request(category: &str, description: impl Into<String>) -> RemoteError {
    RemoteError::new(400, category, description)
}

fn last_chars(value: &str, count: usize) -> String {
    let skip = value.chars().count().saturating_sub(count);
    value.chars().skip(skip).collect()
}

fn find<'a, T, F>(items: &'a [T], uri: &ResourceUri, key: F) -> std::result::Result<&'a T, RemoteError>
where
    F: Fn(&T) -> &ResourceUri,
{
    items.iter().find(|item| key(item) == uri).ok_or_else(|| not_found(uri))
}

/// A self-contained stand-in for the hosted payments API.
///
/// Keeps resources and the marketplace escrow in memory and enforces the
/// same rules the API does (escrow coverage for credits, known funding
/// sources for debits, refund limits), so workflows can be exercised offline.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_escrow(escrow: MinorUnits) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(Ledger {
                escrow,
                ..Ledger::default()
            })),
        }
    }

    pub async fn set_escrow(&self, escrow: MinorUnits) {
        self.ledger.write().await.escrow = escrow;
    }

    pub async fn escrow(&self) -> MinorUnits {
        self.ledger.read().await.escrow
    }

    /// Number of credit requests received, including rejected ones.
    pub async fn credit_calls(&self) -> usize {
        self.ledger.read().await.credit_calls
    }

    pub async fn account_creations(&self) -> usize {
        self.ledger.read().await.account_creations
    }

    /// Makes every later credit to `bank_account` fail with a server error.
    pub async fn fail_credits_to(&self, bank_account: &ResourceUri) {
        self.ledger
            .write()
            .await
            .failing_bank_accounts
            .insert(bank_account.clone());
    }

    /// Tokenizes a card the way a browser-side library would, returning the
    /// token URI. Only the last four digits are retained.
    pub async fn tokenize_card(&self, number: &str, expiration_month: u32, expiration_year: i32) -> ResourceUri {
        let mut ledger = self.ledger.write().await;
        let id = ledger.next("CC");
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        let last_four = last_chars(&digits, 4);
        let brand = match digits.chars().next() {
            Some('4') => "Visa",
            Some('5') => "MasterCard",
            Some('3') => "American Express",
            _ => "Unknown",
        };
        let card = RemoteCard {
            uri: ResourceUri::new(format!("{}/cards/{}", MARKETPLACE_URI, id)),
            id,
            created_at: Utc::now(),
            name: None,
            expiration_month,
            expiration_year,
            last_four,
            brand: brand.to_string(),
            is_valid: true,
            account: None,
        };
        let uri = card.uri.clone();
        ledger.card_tokens.push(card);
        uri
    }

    /// Applies `edit` to a stored bank account, as a change made on the
    /// dashboard would.
    pub async fn edit_bank_account<F>(&self, uri: &ResourceUri, edit: F) -> Result<()>
    where
        F: FnOnce(&mut RemoteBankAccount),
    {
        let mut ledger = self.ledger.write().await;
        let bank_account = ledger
            .bank_accounts
            .iter_mut()
            .find(|b| &b.uri == uri)
            .ok_or_else(|| not_found(uri))?;
        edit(bank_account);
        Ok(())
    }

    /// Applies `edit` to a stored credit, as settlement on the API side would.
    pub async fn edit_credit<F>(&self, uri: &ResourceUri, edit: F) -> Result<()>
    where
        F: FnOnce(&mut RemoteCredit),
    {
        let mut ledger = self.ledger.write().await;
        let credit = ledger
            .credits
            .iter_mut()
            .find(|c| &c.uri == uri)
            .ok_or_else(|| not_found(uri))?;
        edit(credit);
        Ok(())
    }

    pub async fn refunds(&self) -> Vec<RemoteRefund> {
        self.ledger.read().await.refunds.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn marketplace(&self) -> Result<Marketplace> {
        let ledger = self.ledger.read().await;
        Ok(Marketplace {
            uri: ResourceUri::new(MARKETPLACE_URI),
            id: "TEST-MP1".to_string(),
            in_escrow: ledger.escrow,
        })
    }

    async fn create_account(&self, account: NewRemoteAccount) -> Result<RemoteAccount> {
        let mut ledger = self.ledger.write().await;
        ledger.account_creations += 1;
        let id = ledger.next("AC");
        let remote = RemoteAccount {
            uri: ResourceUri::new(format!("{}/accounts/{}", MARKETPLACE_URI, id)),
            id,
            created_at: Utc::now(),
            name: Some(account.name),
        };
        ledger.accounts.push(remote.clone());
        Ok(remote)
    }

    async fn fetch_account(&self, uri: &ResourceUri) -> Result<RemoteAccount> {
        let ledger = self.ledger.read().await;
        Ok(find(&ledger.accounts, uri, |a| &a.uri)?.clone())
    }

    async fn list_accounts(&self) -> Result<Vec<RemoteAccount>> {
        Ok(self.ledger.read().await.accounts.clone())
    }

    async fn add_card(&self, account: &ResourceUri, card: &ResourceUri) -> Result<RemoteAccount> {
        let mut ledger = self.ledger.write().await;
        let remote_account = find(&ledger.accounts, account, |a| &a.uri)?.clone();
        let position = ledger
            .card_tokens
            .iter()
            .position(|c| &c.uri == card)
            .ok_or_else(|| bad_request("card-not-found", format!("Card {} is not a valid token", card)))?;
        let mut remote_card = ledger.card_tokens.remove(position);
        remote_card.account = Some(RemoteRef::from(account.clone()));
        ledger.cards.push(remote_card);
        Ok(remote_account)
    }

    async fn create_bank_account(&self, bank_account: NewRemoteBankAccount) -> Result<RemoteBankAccount> {
        let routing = &bank_account.routing_number;
        if routing.len() != 9 || !routing.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad_request(
                "request",
                format!("Routing number {} is invalid", routing),
            )
            .into());
        }
        let mut ledger = self.ledger.write().await;
        let id = ledger.next("BA");
        let visible = last_chars(&bank_account.account_number, 4);
        let remote = RemoteBankAccount {
            uri: ResourceUri::new(format!("/v1/bank_accounts/{}", id)),
            id,
            created_at: Utc::now(),
            account_number: format!("xxxxx{}", visible),
            name: bank_account.name,
            routing_number: bank_account.routing_number,
            bank_name: "SANDBOX BANK".to_string(),
            account_type: bank_account.account_type,
        };
        ledger.bank_accounts.push(remote.clone());
        Ok(remote)
    }

    async fn fetch_bank_account(&self, uri: &ResourceUri) -> Result<RemoteBankAccount> {
        let ledger = self.ledger.read().await;
        Ok(find(&ledger.bank_accounts, uri, |b| &b.uri)?.clone())
    }

    async fn list_bank_accounts(&self) -> Result<Vec<RemoteBankAccount>> {
        Ok(self.ledger.read().await.bank_accounts.clone())
    }

    async fn delete_bank_account(&self, uri: &ResourceUri) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        find(&ledger.bank_accounts, uri, |b| &b.uri)?;
        ledger.bank_accounts.retain(|b| &b.uri != uri);
        Ok(())
    }

    async fn fetch_card(&self, uri: &ResourceUri) -> Result<RemoteCard> {
        let ledger = self.ledger.read().await;
        Ok(find(&ledger.cards, uri, |c| &c.uri)?.clone())
    }

    async fn list_cards(&self) -> Result<Vec<RemoteCard>> {
        Ok(self.ledger.read().await.cards.clone())
    }

    async fn invalidate_card(&self, uri: &ResourceUri) -> Result<RemoteCard> {
        let mut ledger = self.ledger.write().await;
        let card = ledger
            .cards
            .iter_mut()
            .find(|c| &c.uri == uri)
            .ok_or_else(|| not_found(uri))?;
        card.is_valid = false;
        Ok(card.clone())
    }

    async fn create_credit(&self, bank_account: &ResourceUri, credit: NewRemoteCredit) -> Result<RemoteCredit> {
        let mut ledger = self.ledger.write().await;
        ledger.credit_calls += 1;
        find(&ledger.bank_accounts, bank_account, |b| &b.uri)?;
        if ledger.failing_bank_accounts.contains(bank_account) {
            return Err(RemoteError::new(502, "bank-account-unreachable", "The bank did not respond").into());
        }
        if credit.amount.value() <= 0 {
            return Err(bad_request("request", "Amount must be positive").into());
        }
        if credit.amount > ledger.escrow {
            return Err(RemoteError::new(
                409,
                "insufficient-funds",
                "Marketplace escrow does not cover this credit",
            )
            .into());
        }
        ledger.escrow = MinorUnits(ledger.escrow.value() - credit.amount.value());
        let id = ledger.next("CR");
        let remote = RemoteCredit {
            uri: ResourceUri::new(format!("/v1/credits/{}", id)),
            id,
            created_at: Utc::now(),
            amount: credit.amount,
            description: credit.description,
            appears_on_statement_as: credit.appears_on_statement_as,
            status: CreditStatus::Pending,
            bank_account: RemoteRef::from(bank_account.clone()),
        };
        ledger.credits.push(remote.clone());
        Ok(remote)
    }

    async fn fetch_credit(&self, uri: &ResourceUri) -> Result<RemoteCredit> {
        let ledger = self.ledger.read().await;
        Ok(find(&ledger.credits, uri, |c| &c.uri)?.clone())
    }

    async fn list_credits(&self) -> Result<Vec<RemoteCredit>> {
        Ok(self.ledger.read().await.credits.clone())
    }

    async fn create_debit(&self, account: &ResourceUri, debit: NewRemoteDebit) -> Result<RemoteDebit> {
        let mut ledger = self.ledger.write().await;
        find(&ledger.accounts, account, |a| &a.uri)?;
        let source_known = ledger
            .cards
            .iter()
            .any(|c| c.uri == debit.source_uri && c.is_valid)
            || ledger.bank_accounts.iter().any(|b| b.uri == debit.source_uri);
        if !source_known {
            return Err(bad_request(
                "funding-source-not-debitable",
                format!("{} cannot be debited", debit.source_uri),
            )
            .into());
        }
        if debit.amount.value() <= 0 {
            return Err(bad_request("request", "Amount must be positive").into());
        }
        ledger.escrow = ledger
            .escrow
            .checked_add(debit.amount)
            .ok_or_else(|| bad_request("request", "Escrow balance is out of range"))?;
        let id = ledger.next("WD");
        let remote = RemoteDebit {
            uri: ResourceUri::new(format!("{}/debits/{}", MARKETPLACE_URI, id)),
            id,
            created_at: Utc::now(),
            amount: debit.amount,
            description: Some(debit.description),
            appears_on_statement_as: debit.appears_on_statement_as,
            status: Some("succeeded".to_string()),
            account: Some(RemoteRef::from(account.clone())),
            source: Some(RemoteRef::from(debit.source_uri)),
        };
        ledger.debits.push(remote.clone());
        Ok(remote)
    }

    async fn fetch_debit(&self, uri: &ResourceUri) -> Result<RemoteDebit> {
        let ledger = self.ledger.read().await;
        Ok(find(&ledger.debits, uri, |d| &d.uri)?.clone())
    }

    async fn list_debits(&self) -> Result<Vec<RemoteDebit>> {
        Ok(self.ledger.read().await.debits.clone())
    }

    async fn refund_debit(&self, debit: &ResourceUri, refund: NewRemoteRefund) -> Result<RemoteRefund> {
        let mut ledger = self.ledger.write().await;
        let original = find(&ledger.debits, debit, |d| &d.uri)?.clone();
        let refunded: i64 = ledger
            .refunds
            .iter()
            .filter(|r| &r.debit.uri == debit)
            .map(|r| r.amount.value())
            .sum();
        let amount = refund
            .amount
            .unwrap_or(MinorUnits(original.amount.value() - refunded));
        if amount.value() <= 0 || refunded + amount.value() > original.amount.value() {
            return Err(bad_request(
                "invalid-amount",
                "Refund amount exceeds the remaining debit amount",
            )
            .into());
        }
        ledger.escrow = MinorUnits(ledger.escrow.value() - amount.value());
        let id = ledger.next("RF");
        let remote = RemoteRefund {
            uri: ResourceUri::new(format!("{}/refunds/{}", MARKETPLACE_URI, id)),
            id,
            created_at: Utc::now(),
            amount,
            description: Some(refund.description),
            debit: RemoteRef::from(debit.clone()),
        };
        ledger.refunds.push(remote.clone());
        Ok(remote)
    }
}
