use crate::application::payouts::{CreditAddData, FormErrors, PayoutFormData, Submission};
use crate::domain::bank_account::{BankAccountType, NewBankAccount};
use crate::domain::user::UserId;
use crate::error::{PaymentError, Result};

pub const FORMSET_PREFIX: &str = "form";
pub const CANCEL_MARKER: &str = "_cancel";
/// Upper bound on `form-TOTAL_FORMS`; larger submissions are rejected.
pub const MAX_NUM_FORMS: usize = 1000;

const MANAGEMENT_FORM_TAMPERED: &str = "ManagementForm data is missing or has been tampered with";

const REQUIRED: &str = "This field is required.";
const TEXT_MAX_LEN: usize = 255;

/// A decoded `application/x-www-form-urlencoded` body. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBody(Vec<(String, String)>);

impl FormBody {
    pub fn parse(body: &str) -> Self {
        Self(form_urlencoded::parse(body.as_bytes()).into_owned().collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// The value for `key`, or an empty string.
    pub fn value(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

pub fn field_name(index: usize, field: &str) -> String {
    format!("{}-{}-{}", FORMSET_PREFIX, index, field)
}

pub fn management_field(field: &str) -> String {
    format!("{}-{}", FORMSET_PREFIX, field)
}

/// Reads the confirmation view's submission: either the cancel marker or
/// one row per `form-<n>-*` group, as counted by `form-TOTAL_FORMS`.
pub fn payout_submission(form: &FormBody) -> Result<Submission> {
    if form.contains(CANCEL_MARKER) {
        return Ok(Submission::Cancel);
    }
    let total = form
        .get(&management_field("TOTAL_FORMS"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|total| *total <= MAX_NUM_FORMS)
        .ok_or_else(|| PaymentError::ValidationError(MANAGEMENT_FORM_TAMPERED.to_string()))?;

    let rows = (0..total)
        .map(|i| PayoutFormData {
            bank_account: form.value(&field_name(i, "bank_account")),
            amount: form.value(&field_name(i, "amount")),
            description: form.value(&field_name(i, "description")),
        })
        .collect();
    Ok(Submission::Rows(rows))
}

pub fn credit_add_data(form: &FormBody) -> CreditAddData {
    CreditAddData {
        bank_account: form.value("bank_account"),
        amount: form.value("amount"),
        description: form.value("description"),
        statement_descriptor: form.value("statement_descriptor"),
    }
}

/// Raw fields of the add-bank-account form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankAccountAddData {
    pub name: String,
    pub account_number: String,
    pub routing_number: String,
    pub account_type: String,
    pub user: String,
}

impl BankAccountAddData {
    pub fn from_form(form: &FormBody) -> Self {
        Self {
            name: form.value("name"),
            account_number: form.value("account_number"),
            routing_number: form.value("routing_number"),
            account_type: form.value("type"),
            user: form.value("user"),
        }
    }

    pub fn validate(&self) -> std::result::Result<NewBankAccount, FormErrors> {
        let mut errors = FormErrors::default();
        let name = required_text(&mut errors, "name", &self.name);
        let account_number = required_text(&mut errors, "account_number", &self.account_number);
        let routing_number = required_text(&mut errors, "routing_number", &self.routing_number);

        let account_type = match self.account_type.trim() {
            "" => {
                errors.add("type", REQUIRED);
                None
            }
            value => match value.parse::<BankAccountType>() {
                Ok(account_type) => Some(account_type),
                Err(e) => {
                    errors.add("type", validation_message(e));
                    None
                }
            },
        };

        let user_id = match self.user.trim() {
            "" => None,
            value => match value.parse::<u64>() {
                Ok(id) => Some(UserId(id)),
                Err(_) => {
                    errors.add(
                        "user",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            },
        };

        match account_type {
            Some(account_type) if errors.is_empty() => Ok(NewBankAccount {
                user_id,
                name,
                account_number,
                routing_number,
                account_type,
            }),
            _ => Err(errors),
        }
    }
}

fn required_text(errors: &mut FormErrors, field: &str, raw: &str) -> String {
    let value = raw.trim();
    let len = value.chars().count();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if len > TEXT_MAX_LEN {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                TEXT_MAX_LEN, len
            ),
        );
    }
    value.to_string()
}

fn validation_message(err: PaymentError) -> String {
    match err {
        PaymentError::ValidationError(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repeated_keys() {
        let form = FormBody::parse("action=bulk_pay&selected=%2Fv1%2Fbank_accounts%2FBA1&selected=%2Fv1%2Fbank_accounts%2FBA2");
        assert_eq!(form.get("action"), Some("bulk_pay"));
        assert_eq!(
            form.get_all("selected"),
            vec!["/v1/bank_accounts/BA1", "/v1/bank_accounts/BA2"]
        );
    }

    #[test]
    fn test_payout_submission_rows() {
        let form = FormBody::parse(
            "form-TOTAL_FORMS=2&form-INITIAL_FORMS=2\
             &form-0-bank_account=%2Fv1%2Fbank_accounts%2FBA1&form-0-amount=60.00&form-0-description=a\
             &form-1-bank_account=%2Fv1%2Fbank_accounts%2FBA2&form-1-amount=50&form-1-description=b+c",
        );
        let Submission::Rows(rows) = payout_submission(&form).unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].amount, "50");
        assert_eq!(rows[1].description, "b c");
    }

    #[test]
    fn test_payout_submission_cancel_wins() {
        let form = FormBody::parse("_cancel=Cancel&form-TOTAL_FORMS=1");
        assert_eq!(payout_submission(&form).unwrap(), Submission::Cancel);
    }

    #[test]
    fn test_payout_submission_requires_management_form() {
        let form = FormBody::parse("form-0-amount=1");
        assert!(matches!(
            payout_submission(&form),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_payout_submission_caps_total_forms() {
        let oversized = FormBody::parse("form-TOTAL_FORMS=5000000");
        assert!(matches!(
            payout_submission(&oversized),
            Err(PaymentError::ValidationError(message)) if message == MANAGEMENT_FORM_TAMPERED
        ));

        let at_limit = FormBody::parse(&format!("form-TOTAL_FORMS={}", MAX_NUM_FORMS));
        let Submission::Rows(rows) = payout_submission(&at_limit).unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), MAX_NUM_FORMS);
    }

    #[test]
    fn test_bank_account_add_validation() {
        let data = BankAccountAddData {
            name: "dan carter".to_string(),
            account_number: "123123123".to_string(),
            routing_number: "321174851".to_string(),
            account_type: "savings".to_string(),
            user: "3".to_string(),
        };
        let new = data.validate().unwrap();
        assert_eq!(new.user_id, Some(UserId(3)));
        assert_eq!(new.account_type, BankAccountType::Savings);

        let errors = BankAccountAddData {
            account_type: "money-market".to_string(),
            ..BankAccountAddData::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.field("name"), [REQUIRED.to_string()]);
        assert!(errors.field("type")[0].starts_with("Select a valid choice."));
    }
}
