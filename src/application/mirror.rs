use crate::domain::account::Account;
use crate::domain::bank_account::{BankAccount, NewBankAccount};
use crate::domain::card::Card;
use crate::domain::credit::Credit;
use crate::domain::debit::{validate_statement_descriptor, Debit, FundingSource};
use crate::domain::money::Amount;
use crate::domain::ports::{MirrorStores, PaymentGatewayRef};
use crate::domain::remote::{NewRemoteCredit, NewRemoteDebit, NewRemoteRefund, RemoteRefund};
use crate::domain::resource::ResourceUri;
use crate::domain::user::{User, UserId};
use crate::error::{PaymentError, Result};
use log::info;
use std::collections::BTreeMap;

/// A debit requested on behalf of a user.
#[derive(Debug, Clone, PartialEq)]
pub struct DebitRequest {
    pub amount: Amount,
    pub description: String,
    pub statement_descriptor: Option<String>,
    pub card: Option<ResourceUri>,
    pub bank_account: Option<ResourceUri>,
}

/// Keeps local records in step with the payments API.
///
/// Every write goes to the API first; the local row is only stored once the
/// remote call succeeded, so a failed call leaves the mirror untouched.
pub struct Mirror {
    gateway: PaymentGatewayRef,
    stores: MirrorStores,
}

impl Mirror {
    pub fn new(gateway: PaymentGatewayRef, stores: MirrorStores) -> Self {
        Self { gateway, stores }
    }

    pub fn gateway(&self) -> &PaymentGatewayRef {
        &self.gateway
    }

    pub fn stores(&self) -> &MirrorStores {
        &self.stores
    }

    pub async fn account_for(&self, user_id: UserId) -> Result<Option<Account>> {
        let accounts = self.stores.accounts.get_all().await?;
        Ok(accounts.into_iter().find(|a| a.user_id == user_id))
    }

    /// Fetch-or-create the user's remote account. An existing local row is
    /// returned without any remote call.
    pub async fn ensure_account(&self, user: &User) -> Result<Account> {
        if let Some(account) = self.account_for(user.id).await? {
            return Ok(account);
        }
        let remote = self
            .gateway
            .create_account(Account::creation_payload(user))
            .await?;
        let account = Account::from_remote(&remote, user.id);
        self.stores.accounts.store(account.clone()).await?;
        info!("created account {} for user {}", account.uri, user.id);
        Ok(account)
    }

    pub async fn refresh_account(&self, account: &mut Account) -> Result<()> {
        let remote = self.gateway.fetch_account(&account.uri).await?;
        account.sync_from(&remote);
        self.stores.accounts.store(account.clone()).await
    }

    pub async fn delete_account(&self, account: &Account) -> Result<()> {
        Err(PaymentError::ContractViolation(format!(
            "account {} cannot be deleted",
            account.uri
        )))
    }

    pub async fn bank_account(&self, uri: &ResourceUri) -> Result<BankAccount> {
        self.stores
            .bank_accounts
            .get(uri)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("bank account {}", uri)))
    }

    /// Creates the bank account remotely, then mirrors the API's view of it.
    pub async fn create_bank_account(&self, new: NewBankAccount) -> Result<BankAccount> {
        let remote = self
            .gateway
            .create_bank_account(new.creation_payload())
            .await?;
        let bank_account = BankAccount::from_remote(&remote, new.user_id);
        self.stores.bank_accounts.store(bank_account.clone()).await?;
        info!("created bank account {}", bank_account.uri);
        Ok(bank_account)
    }

    pub async fn refresh_bank_account(&self, bank_account: &mut BankAccount) -> Result<()> {
        let remote = self.gateway.fetch_bank_account(&bank_account.uri).await?;
        bank_account.sync_from(&remote);
        self.stores.bank_accounts.store(bank_account.clone()).await
    }

    pub async fn delete_bank_account(&self, uri: &ResourceUri) -> Result<()> {
        self.gateway.delete_bank_account(uri).await?;
        self.stores.bank_accounts.remove(uri).await?;
        info!("deleted bank account {}", uri);
        Ok(())
    }

    /// Pays `amount` out of the marketplace escrow into `bank_account`.
    pub async fn credit_bank_account(
        &self,
        bank_account: &BankAccount,
        amount: Amount,
        description: Option<String>,
        statement_descriptor: Option<String>,
    ) -> Result<Credit> {
        validate_statement_descriptor(statement_descriptor.as_deref())?;
        let request = NewRemoteCredit {
            amount: amount.to_minor_units()?,
            description,
            appears_on_statement_as: statement_descriptor.clone(),
        };
        let remote = self.gateway.create_credit(&bank_account.uri, request).await?;

        let mut credit = Credit::from_remote(&remote, bank_account.uri.clone(), bank_account.user_id);
        credit.statement_descriptor = statement_descriptor;
        self.stores.credits.store(credit.clone()).await?;
        info!(
            "credited {} to bank account {} as {}",
            credit.amount, bank_account.uri, credit.uri
        );
        Ok(credit)
    }

    pub async fn refresh_credit(&self, credit: &mut Credit) -> Result<()> {
        let remote = self.gateway.fetch_credit(&credit.uri).await?;
        credit.sync_from(&remote);
        self.stores.credits.store(credit.clone()).await
    }

    pub async fn delete_credit(&self, credit: &Credit) -> Result<()> {
        Err(PaymentError::ContractViolation(format!(
            "credit {} cannot be deleted",
            credit.uri
        )))
    }

    pub async fn cards_of(&self, user_id: UserId) -> Result<Vec<Card>> {
        let cards = self.stores.cards.get_all().await?;
        Ok(cards.into_iter().filter(|c| c.user_id == user_id).collect())
    }

    /// Attaches a card token obtained out-of-band to the user's account and
    /// mirrors the resulting card. The token URI becomes the card URI.
    pub async fn add_card(&self, user: &User, card_token: ResourceUri) -> Result<Card> {
        let account = self.ensure_account(user).await?;
        self.gateway.add_card(&account.uri, &card_token).await?;
        let remote = self.gateway.fetch_card(&card_token).await?;
        let card = Card::from_remote(&remote, user.id);
        self.stores.cards.store(card.clone()).await?;
        info!("added card {} for user {}", card.uri, user.id);
        Ok(card)
    }

    pub async fn refresh_card(&self, card: &mut Card) -> Result<()> {
        let remote = self.gateway.fetch_card(&card.uri).await?;
        card.sync_from(&remote);
        self.stores.cards.store(card.clone()).await
    }

    /// Invalidates the card remotely, then drops the local row.
    pub async fn delete_card(&self, uri: &ResourceUri) -> Result<()> {
        self.gateway.invalidate_card(uri).await?;
        self.stores.cards.remove(uri).await?;
        info!("invalidated card {}", uri);
        Ok(())
    }

    /// Charges the user. Without an explicit source the user's first card is
    /// used.
    pub async fn debit(&self, user: &User, request: DebitRequest) -> Result<Debit> {
        validate_statement_descriptor(request.statement_descriptor.as_deref())?;
        let source = match FundingSource::from_parts(request.card, request.bank_account)? {
            Some(source) => source,
            None => {
                let card = self.cards_of(user.id).await?.into_iter().next().ok_or_else(|| {
                    PaymentError::ValidationError(
                        "Must have either \"card\" or \"bank_account\"".to_string(),
                    )
                })?;
                FundingSource::Card(card.uri)
            }
        };

        let account = self.ensure_account(user).await?;
        let remote = self
            .gateway
            .create_debit(
                &account.uri,
                NewRemoteDebit {
                    amount: request.amount.to_minor_units()?,
                    description: request.description,
                    appears_on_statement_as: request.statement_descriptor.clone(),
                    source_uri: source.uri().clone(),
                },
            )
            .await?;

        let mut debit = Debit::from_remote(&remote, user.id, source);
        debit.statement_descriptor = request.statement_descriptor;
        self.stores.debits.store(debit.clone()).await?;
        info!("debited {} from user {} as {}", debit.amount, user.id, debit.uri);
        Ok(debit)
    }

    pub async fn refresh_debit(&self, debit: &mut Debit) -> Result<()> {
        let remote = self.gateway.fetch_debit(&debit.uri).await?;
        debit.sync_from(&remote);
        self.stores.debits.store(debit.clone()).await
    }

    /// Refunds are the only way to reverse a debit.
    pub async fn delete_debit(&self, debit: &Debit) -> Result<()> {
        Err(PaymentError::ContractViolation(format!(
            "debit {} cannot be deleted, refund it instead",
            debit.uri
        )))
    }

    /// Refunds part or all (`amount = None`) of a debit.
    pub async fn refund_debit(
        &self,
        debit: &Debit,
        amount: Option<Amount>,
        description: String,
        meta: BTreeMap<String, String>,
    ) -> Result<RemoteRefund> {
        let amount = amount.map(|a| a.to_minor_units()).transpose()?;
        let refund = self
            .gateway
            .refund_debit(
                &debit.uri,
                NewRemoteRefund {
                    amount,
                    description,
                    meta,
                },
            )
            .await?;
        info!("refunded {} of debit {}", refund.amount, debit.uri);
        Ok(refund)
    }
}
