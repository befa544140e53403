use super::account::Account;
use super::bank_account::BankAccount;
use super::card::Card;
use super::credit::Credit;
use super::debit::Debit;
use super::remote::{
    Marketplace, NewRemoteAccount, NewRemoteBankAccount, NewRemoteCredit, NewRemoteDebit,
    NewRemoteRefund, RemoteAccount, RemoteBankAccount, RemoteCard, RemoteCredit, RemoteDebit,
    RemoteRefund,
};
use super::resource::{Mirrored, ResourceUri};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Local table of mirrored records keyed by resource URI.
#[async_trait]
pub trait MirrorStore<T: Mirrored>: Send + Sync {
    /// Inserts or replaces the record stored under its URI.
    async fn store(&self, record: T) -> Result<()>;
    async fn get(&self, uri: &ResourceUri) -> Result<Option<T>>;
    async fn get_all(&self) -> Result<Vec<T>>;
    async fn remove(&self, uri: &ResourceUri) -> Result<()>;
}

pub type MirrorStoreRef<T> = Arc<dyn MirrorStore<T>>;

/// One store per mirrored resource kind.
#[derive(Clone)]
pub struct MirrorStores {
    pub accounts: MirrorStoreRef<Account>,
    pub bank_accounts: MirrorStoreRef<BankAccount>,
    pub cards: MirrorStoreRef<Card>,
    pub credits: MirrorStoreRef<Credit>,
    pub debits: MirrorStoreRef<Debit>,
}

/// The hosted payments API.
///
/// Every failure is returned as-is; implementations never retry.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The marketplace owned by the configured API key.
    async fn marketplace(&self) -> Result<Marketplace>;

    async fn create_account(&self, account: NewRemoteAccount) -> Result<RemoteAccount>;
    async fn fetch_account(&self, uri: &ResourceUri) -> Result<RemoteAccount>;
    async fn list_accounts(&self) -> Result<Vec<RemoteAccount>>;
    /// Attaches a tokenized card to an account.
    async fn add_card(&self, account: &ResourceUri, card: &ResourceUri) -> Result<RemoteAccount>;

    async fn create_bank_account(&self, bank_account: NewRemoteBankAccount) -> Result<RemoteBankAccount>;
    async fn fetch_bank_account(&self, uri: &ResourceUri) -> Result<RemoteBankAccount>;
    async fn list_bank_accounts(&self) -> Result<Vec<RemoteBankAccount>>;
    async fn delete_bank_account(&self, uri: &ResourceUri) -> Result<()>;

    async fn fetch_card(&self, uri: &ResourceUri) -> Result<RemoteCard>;
    async fn list_cards(&self) -> Result<Vec<RemoteCard>>;
    async fn invalidate_card(&self, uri: &ResourceUri) -> Result<RemoteCard>;

    async fn create_credit(&self, bank_account: &ResourceUri, credit: NewRemoteCredit) -> Result<RemoteCredit>;
    async fn fetch_credit(&self, uri: &ResourceUri) -> Result<RemoteCredit>;
    async fn list_credits(&self) -> Result<Vec<RemoteCredit>>;

    async fn create_debit(&self, account: &ResourceUri, debit: NewRemoteDebit) -> Result<RemoteDebit>;
    async fn fetch_debit(&self, uri: &ResourceUri) -> Result<RemoteDebit>;
    async fn list_debits(&self) -> Result<Vec<RemoteDebit>>;
    async fn refund_debit(&self, debit: &ResourceUri, refund: NewRemoteRefund) -> Result<RemoteRefund>;
}

pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
