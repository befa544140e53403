mod common;

use balanced_mirror::application::payouts::{
    BATCH_INSUFFICIENT_FUNDS, BulkPay, BulkPayoutFormSet, Confirmation, CreditAddData, CreditAddForm,
    NON_FIELD_ERRORS, PAYOUTS_CANCELLED, PAYOUTS_MADE, PayoutFormData, SINGLE_INSUFFICIENT_FUNDS,
    Submission, SubmitOutcome,
};
use balanced_mirror::domain::money::{Amount, MinorUnits};
use balanced_mirror::domain::resource::ResourceUri;
use balanced_mirror::error::PaymentError;
use common::Harness;
use rust_decimal_macros::dec;

fn row(bank_account: &ResourceUri, amount: &str, description: &str) -> PayoutFormData {
    PayoutFormData {
        bank_account: bank_account.to_string(),
        amount: amount.to_string(),
        description: description.to_string(),
    }
}

#[tokio::test]
async fn test_batch_over_escrow_is_rejected_without_remote_calls() {
    // $100.00 in escrow, $60.00 + $50.00 requested.
    let harness = Harness::with_escrow(10000);
    let first = harness.bank_account("alice").await;
    let second = harness.bank_account("bob").await;

    let formset = BulkPayoutFormSet::bind(
        vec![row(&first.uri, "60.00", "March"), row(&second.uri, "50.00", "March")],
        &harness.mirror,
    )
    .await
    .unwrap();

    assert!(!formset.is_valid());
    assert_eq!(formset.non_form_errors(), [BATCH_INSUFFICIENT_FUNDS.to_string()]);
    assert!(formset.forms().iter().all(|f| f.errors().is_empty()));
    assert_eq!(harness.gateway.credit_calls().await, 0);
    assert_eq!(harness.credit_count().await, 0);

    assert!(matches!(
        formset.execute(&harness.mirror).await,
        Err(PaymentError::ContractViolation(_))
    ));
    assert_eq!(harness.gateway.credit_calls().await, 0);
}

#[tokio::test]
async fn test_batch_within_escrow_credits_each_row() {
    let harness = Harness::with_escrow(11000);
    let first = harness.bank_account("alice").await;
    let second = harness.bank_account("bob").await;

    let formset = BulkPayoutFormSet::bind(
        vec![row(&first.uri, "60.00", "March"), row(&second.uri, "50", "Bonus")],
        &harness.mirror,
    )
    .await
    .unwrap();
    assert!(formset.is_valid());
    assert_eq!(formset.total().unwrap(), MinorUnits(11000));

    let credits = formset.execute(&harness.mirror).await.unwrap();

    assert_eq!(credits.len(), 2);
    assert_eq!(credits[0].bank_account, first.uri);
    assert_eq!(credits[0].amount, Amount::new(dec!(60)).unwrap());
    assert_eq!(credits[1].bank_account, second.uri);
    assert_eq!(credits[1].amount, Amount::new(dec!(50)).unwrap());
    assert_eq!(credits[1].description.as_deref(), Some("Bonus"));
    assert_eq!(harness.credit_count().await, 2);
    assert_eq!(harness.gateway.escrow().await, MinorUnits::ZERO);
}

#[tokio::test]
async fn test_invalid_rows_report_per_field_errors() {
    let harness = Harness::with_escrow(10000);
    let bank_account = harness.bank_account("alice").await;

    let formset = BulkPayoutFormSet::bind(
        vec![
            row(&bank_account.uri, "0.49", "too small"),
            row(&bank_account.uri, "1.005", ""),
            row(&ResourceUri::new("/v1/bank_accounts/missing"), "5", "x"),
        ],
        &harness.mirror,
    )
    .await
    .unwrap();

    assert!(!formset.is_valid());
    let forms = formset.forms();
    assert_eq!(
        forms[0].errors().field("amount"),
        ["Ensure this value is greater than or equal to 0.50.".to_string()]
    );
    assert_eq!(
        forms[1].errors().field("amount"),
        ["Ensure that there are no more than 2 decimal places.".to_string()]
    );
    assert_eq!(forms[1].errors().field("description"), ["This field is required.".to_string()]);
    assert!(forms[2].errors().field("bank_account")[0].starts_with("Select a valid choice."));
    assert!(formset.non_form_errors().is_empty());
    assert_eq!(harness.gateway.credit_calls().await, 0);
}

#[tokio::test]
async fn test_remote_failure_mid_batch_keeps_earlier_credits() {
    let harness = Harness::with_escrow(10000);
    let first = harness.bank_account("alice").await;
    let second = harness.bank_account("bob").await;
    harness.gateway.fail_credits_to(&second.uri).await;

    let formset = BulkPayoutFormSet::bind(
        vec![row(&first.uri, "10", "a"), row(&second.uri, "10", "b")],
        &harness.mirror,
    )
    .await
    .unwrap();
    let result = formset.execute(&harness.mirror).await;

    assert!(matches!(result, Err(PaymentError::RemoteError(_))));
    assert_eq!(harness.credit_count().await, 1);
    assert_eq!(harness.gateway.escrow().await, MinorUnits(9000));
}

#[tokio::test]
async fn test_escrow_drained_between_check_and_execute() {
    let harness = Harness::with_escrow(10000);
    let bank_account = harness.bank_account("alice").await;
    let formset = BulkPayoutFormSet::bind(vec![row(&bank_account.uri, "80", "a")], &harness.mirror)
        .await
        .unwrap();
    assert!(formset.is_valid());

    // Another payout empties the escrow before this batch runs.
    harness.gateway.set_escrow(MinorUnits(1000)).await;

    let result = formset.execute(&harness.mirror).await;
    assert!(matches!(result, Err(PaymentError::RemoteError(_))));
    assert_eq!(harness.credit_count().await, 0);
}

#[tokio::test]
async fn test_single_payout_checks_minimum_then_escrow() {
    let harness = Harness::with_escrow(1000);
    let bank_account = harness.bank_account("alice").await;
    let data = |amount: &str| CreditAddData {
        bank_account: bank_account.uri.to_string(),
        amount: amount.to_string(),
        ..CreditAddData::default()
    };

    let below_minimum = CreditAddForm::bind(data("0.25"), &harness.mirror).await.unwrap();
    assert!(!below_minimum.is_valid());
    assert!(!below_minimum.errors().field("amount").is_empty());

    let too_large = CreditAddForm::bind(data("10.01"), &harness.mirror).await.unwrap();
    assert_eq!(
        too_large.errors().field(NON_FIELD_ERRORS),
        [SINGLE_INSUFFICIENT_FUNDS.to_string()]
    );
    assert!(matches!(
        too_large.save(&harness.mirror).await,
        Err(PaymentError::ContractViolation(_))
    ));
    assert_eq!(harness.gateway.credit_calls().await, 0);

    let exact = CreditAddForm::bind(data("10.00"), &harness.mirror).await.unwrap();
    assert!(exact.is_valid());
    let credit = exact.save(&harness.mirror).await.unwrap();
    assert_eq!(credit.amount, Amount::new(dec!(10)).unwrap());
    assert_eq!(credit.description, None);
    assert_eq!(harness.gateway.credit_calls().await, 1);
}

#[tokio::test]
async fn test_bulk_pay_session_flow() {
    let harness = Harness::with_escrow(10000);
    let first = harness.bank_account("alice").await;
    let second = harness.bank_account("bob").await;
    let bulk_pay = BulkPay::new(harness.mirror.clone());
    let mut session = None;

    assert!(matches!(
        bulk_pay.confirm(&session).await.unwrap(),
        Confirmation::RedirectBack
    ));
    assert!(bulk_pay.select(&mut session, Vec::new()).is_err());
    assert!(session.is_none());

    bulk_pay
        .select(&mut session, vec![first.uri.clone(), second.uri.clone()])
        .unwrap();
    let Confirmation::Render(initial) = bulk_pay.confirm(&session).await.unwrap() else {
        panic!("expected the confirmation form");
    };
    assert_eq!(initial.forms().len(), 2);
    assert_eq!(initial.forms()[0].data().bank_account, first.uri.to_string());

    let invalid = bulk_pay
        .submit(
            &mut session,
            Submission::Rows(vec![row(&first.uri, "60", "a"), row(&second.uri, "50", "b")]),
        )
        .await
        .unwrap();
    assert!(matches!(invalid, SubmitOutcome::Invalid(_)));
    assert!(session.is_some());

    let completed = bulk_pay
        .submit(
            &mut session,
            Submission::Rows(vec![row(&first.uri, "60", "a"), row(&second.uri, "40", "b")]),
        )
        .await
        .unwrap();
    let SubmitOutcome::Completed { notice, credits } = completed else {
        panic!("expected the payouts to complete");
    };
    assert_eq!(notice, PAYOUTS_MADE);
    assert_eq!(credits.len(), 2);
    assert!(session.is_none());
}

#[tokio::test]
async fn test_bulk_pay_cancel_clears_selection() {
    let harness = Harness::with_escrow(10000);
    let bank_account = harness.bank_account("alice").await;
    let bulk_pay = BulkPay::new(harness.mirror.clone());
    let mut session = None;
    bulk_pay.select(&mut session, vec![bank_account.uri]).unwrap();

    let outcome = bulk_pay.submit(&mut session, Submission::Cancel).await.unwrap();

    assert!(matches!(outcome, SubmitOutcome::Cancelled { notice } if notice == PAYOUTS_CANCELLED));
    assert!(session.is_none());
    assert_eq!(harness.gateway.credit_calls().await, 0);
    assert!(matches!(
        bulk_pay.submit(&mut session, Submission::Cancel).await.unwrap(),
        SubmitOutcome::RedirectBack
    ));
}

#[tokio::test]
async fn test_amounts_beyond_ten_digits_are_field_errors() {
    let harness = Harness::with_escrow(10000);
    let bank_account = harness.bank_account("alice").await;
    let digits = "Ensure that there are no more than 10 digits in total.".to_string();

    let formset = BulkPayoutFormSet::bind(
        vec![row(&bank_account.uri, "79228162514264337593543950335", "max")],
        &harness.mirror,
    )
    .await
    .unwrap();
    assert!(!formset.is_valid());
    assert_eq!(formset.forms()[0].errors().field("amount"), [digits.clone()]);

    // Each row alone fits in cents, but the pair would overflow the total.
    let formset = BulkPayoutFormSet::bind(
        vec![
            row(&bank_account.uri, "50000000000000000", "a"),
            row(&bank_account.uri, "50000000000000000", "b"),
        ],
        &harness.mirror,
    )
    .await
    .unwrap();
    assert!(!formset.is_valid());
    assert!(formset.forms().iter().all(|f| f.errors().field("amount") == [digits.clone()]));
    assert_eq!(harness.gateway.credit_calls().await, 0);

    let single = CreditAddForm::bind(
        CreditAddData {
            bank_account: bank_account.uri.to_string(),
            amount: "79228162514264337593543950335".to_string(),
            ..CreditAddData::default()
        },
        &harness.mirror,
    )
    .await
    .unwrap();
    assert_eq!(single.errors().field("amount"), [digits]);
}
