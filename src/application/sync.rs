use crate::domain::account::Account;
use crate::domain::bank_account::BankAccount;
use crate::domain::card::Card;
use crate::domain::credit::Credit;
use crate::domain::debit::{Debit, FundingSource};
use crate::domain::ports::{MirrorStores, PaymentGatewayRef};
use crate::domain::remote::RemoteRef;
use crate::domain::resource::{ResourceKind, ResourceUri};
use crate::domain::user::UserId;
use crate::error::Result;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// What a `sync` run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    All,
    Kind(ResourceKind),
}

impl SyncTarget {
    /// Kinds to scan, owners before the resources that reference them.
    pub fn kinds(&self) -> Vec<ResourceKind> {
        match self {
            SyncTarget::All => ResourceKind::ALL.to_vec(),
            SyncTarget::Kind(kind) => vec![*kind],
        }
    }
}

impl FromStr for SyncTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(SyncTarget::All);
        }
        s.parse().map(SyncTarget::Kind)
    }
}

/// Outcome of one full re-scan of a kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: ResourceKind,
    pub created: usize,
    pub updated: usize,
    /// Remote resources whose local owner could not be resolved.
    pub skipped: usize,
}

impl SyncReport {
    fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            created: 0,
            updated: 0,
            skipped: 0,
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} created, {} updated, {} skipped",
            self.kind, self.created, self.updated, self.skipped
        )
    }
}

/// Re-scans remote collections into the local tables.
///
/// Every run lists the whole remote collection; rows are matched by URI so
/// repeated runs never duplicate them. Relational fields are resolved
/// against rows already mirrored, which is why `All` walks kinds in
/// dependency order.
pub struct Synchronizer {
    gateway: PaymentGatewayRef,
    stores: MirrorStores,
}

impl Synchronizer {
    pub fn new(gateway: PaymentGatewayRef, stores: MirrorStores) -> Self {
        Self { gateway, stores }
    }

    pub async fn run(&self, target: SyncTarget) -> Result<Vec<SyncReport>> {
        let mut reports = Vec::new();
        for kind in target.kinds() {
            let report = self.sync(kind).await?;
            info!("synchronized {}", report);
            reports.push(report);
        }
        Ok(reports)
    }

    pub async fn sync(&self, kind: ResourceKind) -> Result<SyncReport> {
        match kind {
            ResourceKind::Accounts => self.sync_accounts().await,
            ResourceKind::BankAccounts => self.sync_bank_accounts().await,
            ResourceKind::Cards => self.sync_cards().await,
            ResourceKind::Credits => self.sync_credits().await,
            ResourceKind::Debits => self.sync_debits().await,
        }
    }

    /// Remote accounts carry no reference to a local user, so only rows
    /// created through provisioning can be refreshed.
    async fn sync_accounts(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new(ResourceKind::Accounts);
        for remote in self.gateway.list_accounts().await? {
            match self.stores.accounts.get(&remote.uri).await? {
                Some(mut account) => {
                    account.sync_from(&remote);
                    self.stores.accounts.store(account).await?;
                    report.updated += 1;
                }
                None => {
                    debug!("skipping account {} with no local user", remote.uri);
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }

    async fn sync_bank_accounts(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new(ResourceKind::BankAccounts);
        for remote in self.gateway.list_bank_accounts().await? {
            match self.stores.bank_accounts.get(&remote.uri).await? {
                Some(mut bank_account) => {
                    bank_account.sync_from(&remote);
                    self.stores.bank_accounts.store(bank_account).await?;
                    report.updated += 1;
                }
                None => {
                    self.stores
                        .bank_accounts
                        .store(BankAccount::from_remote(&remote, None))
                        .await?;
                    report.created += 1;
                }
            }
        }
        Ok(report)
    }

    async fn sync_cards(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new(ResourceKind::Cards);
        let owners = self.account_owners().await?;
        for remote in self.gateway.list_cards().await? {
            if let Some(mut card) = self.stores.cards.get(&remote.uri).await? {
                card.sync_from(&remote);
                self.stores.cards.store(card).await?;
                report.updated += 1;
                continue;
            }
            match owner_of(&owners, remote.account.as_ref()) {
                Some(user_id) => {
                    self.stores
                        .cards
                        .store(Card::from_remote(&remote, user_id))
                        .await?;
                    report.created += 1;
                }
                None => {
                    debug!("skipping card {} with no local account", remote.uri);
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }

    async fn sync_credits(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new(ResourceKind::Credits);
        for remote in self.gateway.list_credits().await? {
            if let Some(mut credit) = self.stores.credits.get(&remote.uri).await? {
                credit.sync_from(&remote);
                self.stores.credits.store(credit).await?;
                report.updated += 1;
                continue;
            }
            match self.stores.bank_accounts.get(&remote.bank_account.uri).await? {
                Some(bank_account) => {
                    let credit = Credit::from_remote(&remote, bank_account.uri, bank_account.user_id);
                    self.stores.credits.store(credit).await?;
                    report.created += 1;
                }
                None => {
                    debug!(
                        "skipping credit {} to unknown bank account {}",
                        remote.uri, remote.bank_account.uri
                    );
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }

    async fn sync_debits(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new(ResourceKind::Debits);
        let owners = self.account_owners().await?;
        for remote in self.gateway.list_debits().await? {
            if let Some(mut debit) = self.stores.debits.get(&remote.uri).await? {
                debit.sync_from(&remote);
                self.stores.debits.store(debit).await?;
                report.updated += 1;
                continue;
            }
            let user_id = owner_of(&owners, remote.account.as_ref());
            let source = remote.source.as_ref().map(|s| FundingSource::from_uri(s.uri.clone()));
            match (user_id, source) {
                (Some(user_id), Some(source)) => {
                    self.stores
                        .debits
                        .store(Debit::from_remote(&remote, user_id, source))
                        .await?;
                    report.created += 1;
                }
                _ => {
                    warn!("skipping debit {} with no local owner or source", remote.uri);
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }

    async fn account_owners(&self) -> Result<HashMap<ResourceUri, UserId>> {
        let accounts: Vec<Account> = self.stores.accounts.get_all().await?;
        Ok(accounts.into_iter().map(|a| (a.uri, a.user_id)).collect())
    }
}

fn owner_of(owners: &HashMap<ResourceUri, UserId>, account: Option<&RemoteRef>) -> Option<UserId> {
    account.and_then(|a| owners.get(&a.uri).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_target_parsing() {
        assert_eq!("all".parse::<SyncTarget>().unwrap(), SyncTarget::All);
        assert_eq!(
            "bank-accounts".parse::<SyncTarget>().unwrap(),
            SyncTarget::Kind(ResourceKind::BankAccounts)
        );
        assert!("refunds".parse::<SyncTarget>().is_err());
    }

    #[test]
    fn test_all_walks_owners_first() {
        let kinds = SyncTarget::All.kinds();
        let position = |k| kinds.iter().position(|x| *x == k).unwrap();
        assert!(position(ResourceKind::Accounts) < position(ResourceKind::Cards));
        assert!(position(ResourceKind::BankAccounts) < position(ResourceKind::Credits));
    }
}
