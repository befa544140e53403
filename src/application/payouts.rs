//! Admin payout workflow.
//!
//! Forms validate raw submitted strings into typed payouts; validation
//! failures are collected as [`FormErrors`] and never returned as `Err`.
//! `Err` is reserved for store and remote failures, and for executing a
//! form that did not validate.
//!
//! The escrow balance is read during validation and not held while the
//! credits execute. A concurrent payout can drain the escrow in between, in
//! which case the API rejects the later credits and the batch stops part way.

use crate::application::mirror::Mirror;
use crate::domain::bank_account::BankAccount;
use crate::domain::credit::Credit;
use crate::domain::debit::STATEMENT_DESCRIPTOR_MAX_LEN;
use crate::domain::money::{Amount, MinorUnits};
use crate::domain::resource::ResourceUri;
use crate::error::{PaymentError, Result};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Session slot holding the bank accounts picked for a bulk payout.
pub const SESSION_KEY: &str = "bank_account_bulk_pay";

/// Key under which errors not tied to one field are collected.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const BATCH_INSUFFICIENT_FUNDS: &str = "You have insufficient funds to cover this payout.";
pub const SINGLE_INSUFFICIENT_FUNDS: &str = "You have insufficient funds to cover this transfer.";
pub const PAYOUTS_MADE: &str = "Your payouts have been made.";
pub const PAYOUTS_CANCELLED: &str = "Your payouts have been cancelled";
pub const BATCH_TOTAL_OUT_OF_RANGE: &str = "The payout total is too large.";
pub const NOTHING_SELECTED: &str =
    "Items must be selected in order to perform actions on them. No items have been changed.";

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
const DESCRIPTION_MAX_LEN: usize = 255;
/// Largest amount a credit row can hold: ten digits, two of them decimals.
const AMOUNT_MAX_DIGITS: u32 = 10;

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        self.field(NON_FIELD_ERRORS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                if field == NON_FIELD_ERRORS {
                    write!(f, "{}", message)?;
                } else {
                    write!(f, "{}: {}", field, message)?;
                }
            }
        }
        Ok(())
    }
}

fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

/// Parses a submitted decimal the way the admin forms expect it.
fn clean_amount(raw: &str) -> std::result::Result<Amount, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(REQUIRED.to_string());
    }
    let value = Decimal::from_str(raw).map_err(|_| "Enter a number.".to_string())?;

    let decimals = value.scale();
    if decimals > 2 {
        return Err("Ensure that there are no more than 2 decimal places.".to_string());
    }
    let mantissa_digits = value.mantissa().unsigned_abs().to_string().len() as u32;
    if mantissa_digits.max(decimals) > AMOUNT_MAX_DIGITS {
        return Err(format!(
            "Ensure that there are no more than {} digits in total.",
            AMOUNT_MAX_DIGITS
        ));
    }

    let minimum = Amount::min_payout();
    if value < minimum.value() {
        return Err(format!(
            "Ensure this value is greater than or equal to {}.",
            minimum
        ));
    }
    let amount = Amount::new(value).map_err(|e| e.to_string())?;
    amount.to_minor_units().map_err(|e| e.to_string())?;
    Ok(amount)
}

async fn clean_bank_account(raw: &str, mirror: &Mirror) -> Result<std::result::Result<BankAccount, String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Err(REQUIRED.to_string()));
    }
    Ok(mirror
        .stores()
        .bank_accounts
        .get(&ResourceUri::new(raw))
        .await?
        .ok_or_else(|| INVALID_CHOICE.to_string()))
}

async fn escrow(mirror: &Mirror) -> Result<MinorUnits> {
    Ok(mirror.gateway().marketplace().await?.in_escrow)
}

/// Raw fields of one payout row, as posted or read from CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutFormData {
    pub bank_account: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub description: String,
}

impl PayoutFormData {
    pub fn initial(bank_account: &BankAccount) -> Self {
        Self {
            bank_account: bank_account.uri.to_string(),
            ..Self::default()
        }
    }
}

/// A validated payout.
#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub bank_account: BankAccount,
    pub amount: Amount,
    pub description: String,
}

/// One payout row: a hidden bank-account reference, an amount of at least
/// 0.50 and a required description.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutForm {
    data: PayoutFormData,
    bank_account: Option<BankAccount>,
    cleaned: Option<Payout>,
    errors: FormErrors,
    bound: bool,
}

impl PayoutForm {
    /// An unbound form offering a payout to `bank_account`.
    pub fn initial(bank_account: BankAccount) -> Self {
        Self {
            data: PayoutFormData::initial(&bank_account),
            bank_account: Some(bank_account),
            cleaned: None,
            errors: FormErrors::default(),
            bound: false,
        }
    }

    pub async fn bind(data: PayoutFormData, mirror: &Mirror) -> Result<Self> {
        let mut errors = FormErrors::default();

        let bank_account = match clean_bank_account(&data.bank_account, mirror).await? {
            Ok(bank_account) => Some(bank_account),
            Err(message) => {
                errors.add("bank_account", message);
                None
            }
        };
        let amount = match clean_amount(&data.amount) {
            Ok(amount) => Some(amount),
            Err(message) => {
                errors.add("amount", message);
                None
            }
        };
        let description = data.description.trim().to_string();
        if description.is_empty() {
            errors.add("description", REQUIRED);
        }

        let cleaned = match (&bank_account, amount) {
            (Some(bank_account), Some(amount)) if errors.is_empty() => Some(Payout {
                bank_account: bank_account.clone(),
                amount,
                description,
            }),
            _ => None,
        };

        Ok(Self {
            data,
            bank_account,
            cleaned,
            errors,
            bound: true,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.bound && self.cleaned.is_some()
    }

    pub fn data(&self) -> &PayoutFormData {
        &self.data
    }

    pub fn bank_account(&self) -> Option<&BankAccount> {
        self.bank_account.as_ref()
    }

    pub fn cleaned(&self) -> Option<&Payout> {
        self.cleaned.as_ref()
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Issues the credit. Saving a form that did not validate is a
    /// programming error.
    pub async fn save(&self, mirror: &Mirror) -> Result<Credit> {
        let payout = self.cleaned.as_ref().ok_or_else(|| {
            PaymentError::ContractViolation("cannot save an invalid payout form".to_string())
        })?;
        mirror
            .credit_bank_account(
                &payout.bank_account,
                payout.amount,
                Some(payout.description.clone()),
                None,
            )
            .await
    }
}

/// A batch of payout rows validated together against the escrow balance.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkPayoutFormSet {
    forms: Vec<PayoutForm>,
    non_form_errors: Vec<String>,
    bound: bool,
}

impl BulkPayoutFormSet {
    pub fn initial(bank_accounts: Vec<BankAccount>) -> Self {
        Self {
            forms: bank_accounts.into_iter().map(PayoutForm::initial).collect(),
            non_form_errors: Vec::new(),
            bound: false,
        }
    }

    /// Validates every row, then, only if all rows are valid, checks the
    /// batch total against the current escrow balance.
    pub async fn bind(rows: Vec<PayoutFormData>, mirror: &Mirror) -> Result<Self> {
        let mut forms = Vec::with_capacity(rows.len());
        for row in rows {
            forms.push(PayoutForm::bind(row, mirror).await?);
        }
        let mut formset = Self {
            forms,
            non_form_errors: Vec::new(),
            bound: true,
        };

        if formset.forms.iter().all(PayoutForm::is_valid) {
            formset.check_escrow(mirror).await?;
        }
        Ok(formset)
    }

    async fn check_escrow(&mut self, mirror: &Mirror) -> Result<()> {
        let total = match self.total() {
            Ok(total) => total,
            Err(err) => {
                warn!("rejecting payout batch: {}", err);
                self.non_form_errors.push(BATCH_TOTAL_OUT_OF_RANGE.to_string());
                return Ok(());
            }
        };
        let available = escrow(mirror).await?;
        if total > available {
            warn!(
                "rejecting payout batch of {} cents, escrow holds {}",
                total, available
            );
            self.non_form_errors.push(BATCH_INSUFFICIENT_FUNDS.to_string());
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.bound && self.non_form_errors.is_empty() && self.forms.iter().all(PayoutForm::is_valid)
    }

    pub fn forms(&self) -> &[PayoutForm] {
        &self.forms
    }

    pub fn non_form_errors(&self) -> &[String] {
        &self.non_form_errors
    }

    /// Sum of the validated amounts in minor units.
    pub fn total(&self) -> Result<MinorUnits> {
        let amounts = self
            .forms
            .iter()
            .filter_map(PayoutForm::cleaned)
            .map(|payout| payout.amount.to_minor_units())
            .collect::<Result<Vec<_>>>()?;
        MinorUnits::checked_sum(amounts)
    }

    /// Issues one credit per row, in order. A remote failure stops the batch
    /// and earlier credits stand.
    pub async fn execute(&self, mirror: &Mirror) -> Result<Vec<Credit>> {
        if !self.is_valid() {
            return Err(PaymentError::ContractViolation(
                "cannot execute an invalid payout batch".to_string(),
            ));
        }
        let mut credits = Vec::with_capacity(self.forms.len());
        for form in &self.forms {
            credits.push(form.save(mirror).await?);
        }
        info!("executed payout batch of {} credits", credits.len());
        Ok(credits)
    }
}

/// Raw fields of the single-payout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAddData {
    #[serde(default)]
    pub bank_account: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub statement_descriptor: String,
}

#[derive(Debug, Clone, PartialEq)]
struct CleanedCredit {
    bank_account: BankAccount,
    amount: Amount,
    description: Option<String>,
    statement_descriptor: Option<String>,
}

/// The single-payout form: same escrow rule as the batch, applied to one
/// amount.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditAddForm {
    data: CreditAddData,
    cleaned: Option<CleanedCredit>,
    errors: FormErrors,
}

impl CreditAddForm {
    pub fn unbound() -> Self {
        Self {
            data: CreditAddData::default(),
            cleaned: None,
            errors: FormErrors::default(),
        }
    }

    pub async fn bind(data: CreditAddData, mirror: &Mirror) -> Result<Self> {
        let mut errors = FormErrors::default();

        let bank_account = match clean_bank_account(&data.bank_account, mirror).await? {
            Ok(bank_account) => Some(bank_account),
            Err(message) => {
                errors.add("bank_account", message);
                None
            }
        };
        let amount = match clean_amount(&data.amount) {
            Ok(amount) => Some(amount),
            Err(message) => {
                errors.add("amount", message);
                None
            }
        };

        let description = data.description.trim();
        let description_len = description.chars().count();
        if description_len > DESCRIPTION_MAX_LEN {
            errors.add("description", max_length_message(DESCRIPTION_MAX_LEN, description_len));
        }
        let descriptor = data.statement_descriptor.trim();
        let descriptor_len = descriptor.chars().count();
        if descriptor_len > STATEMENT_DESCRIPTOR_MAX_LEN {
            errors.add(
                "statement_descriptor",
                max_length_message(STATEMENT_DESCRIPTOR_MAX_LEN, descriptor_len),
            );
        }

        let mut cleaned = None;
        if let (Some(bank_account), Some(amount)) = (bank_account, amount) {
            if errors.is_empty() {
                if amount.to_minor_units()? > escrow(mirror).await? {
                    errors.add(NON_FIELD_ERRORS, SINGLE_INSUFFICIENT_FUNDS);
                } else {
                    cleaned = Some(CleanedCredit {
                        bank_account,
                        amount,
                        description: Some(description.to_string()).filter(|d| !d.is_empty()),
                        statement_descriptor: Some(descriptor.to_string()).filter(|d| !d.is_empty()),
                    });
                }
            }
        }

        Ok(Self {
            data,
            cleaned,
            errors,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.cleaned.is_some()
    }

    pub fn data(&self) -> &CreditAddData {
        &self.data
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub async fn save(&self, mirror: &Mirror) -> Result<Credit> {
        let credit = self.cleaned.as_ref().ok_or_else(|| {
            PaymentError::ContractViolation("cannot save an invalid credit form".to_string())
        })?;
        mirror
            .credit_bank_account(
                &credit.bank_account,
                credit.amount,
                credit.description.clone(),
                credit.statement_descriptor.clone(),
            )
            .await
    }
}

/// Bank accounts picked from the list view, kept in the session between the
/// selection and the confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSelection {
    pub bank_accounts: Vec<ResourceUri>,
}

/// What the confirmation view should do.
#[derive(Debug)]
pub enum Confirmation {
    RedirectBack,
    Render(BulkPayoutFormSet),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Cancel,
    Rows(Vec<PayoutFormData>),
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// No selection in the session.
    RedirectBack,
    /// Re-render with errors; the selection is kept.
    Invalid(BulkPayoutFormSet),
    Completed {
        notice: &'static str,
        credits: Vec<Credit>,
    },
    Cancelled {
        notice: &'static str,
    },
}

/// The select, confirm, submit flow behind the "Credit selected accounts"
/// admin action. The caller owns the session slot and passes it in.
#[derive(Clone)]
pub struct BulkPay {
    mirror: Arc<Mirror>,
}

impl BulkPay {
    pub fn new(mirror: Arc<Mirror>) -> Self {
        Self { mirror }
    }

    pub fn select(&self, session: &mut Option<PayoutSelection>, bank_accounts: Vec<ResourceUri>) -> Result<()> {
        if bank_accounts.is_empty() {
            return Err(PaymentError::ValidationError(NOTHING_SELECTED.to_string()));
        }
        *session = Some(PayoutSelection { bank_accounts });
        Ok(())
    }

    /// One initial row per selected bank account that still exists locally.
    pub async fn confirm(&self, session: &Option<PayoutSelection>) -> Result<Confirmation> {
        let Some(selection) = session else {
            return Ok(Confirmation::RedirectBack);
        };
        let mut bank_accounts = Vec::with_capacity(selection.bank_accounts.len());
        for uri in &selection.bank_accounts {
            if let Some(bank_account) = self.mirror.stores().bank_accounts.get(uri).await? {
                bank_accounts.push(bank_account);
            }
        }
        Ok(Confirmation::Render(BulkPayoutFormSet::initial(bank_accounts)))
    }

    pub async fn submit(&self, session: &mut Option<PayoutSelection>, submission: Submission) -> Result<SubmitOutcome> {
        if session.is_none() {
            return Ok(SubmitOutcome::RedirectBack);
        }
        let rows = match submission {
            Submission::Cancel => {
                *session = None;
                return Ok(SubmitOutcome::Cancelled {
                    notice: PAYOUTS_CANCELLED,
                });
            }
            Submission::Rows(rows) => rows,
        };

        let formset = BulkPayoutFormSet::bind(rows, &self.mirror).await?;
        if !formset.is_valid() {
            return Ok(SubmitOutcome::Invalid(formset));
        }
        let credits = formset.execute(&self.mirror).await?;
        *session = None;
        Ok(SubmitOutcome::Completed {
            notice: PAYOUTS_MADE,
            credits,
        })
    }
}
