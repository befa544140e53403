use super::forms::{payout_submission, FormBody};
use super::views;
use super::{html, http_error, load_selection, push_notice, redirect, save_selection, State, BANK_ACCOUNTS_PATH};
use crate::application::payouts::{Confirmation, SubmitOutcome};
use log::info;
use tide::Request;

/// Confirmation view for the selected bank accounts.
pub async fn confirm(req: Request<State>) -> tide::Result {
    let selection = load_selection(&req);
    match req.state().bulk_pay.confirm(&selection).await.map_err(http_error)? {
        Confirmation::RedirectBack => Ok(redirect(BANK_ACCOUNTS_PATH)),
        Confirmation::Render(formset) => Ok(html(views::bulk_pay(&formset))),
    }
}

pub async fn submit(mut req: Request<State>) -> tide::Result {
    let mut selection = load_selection(&req);
    if selection.is_none() {
        return Ok(redirect(BANK_ACCOUNTS_PATH));
    }
    let body = req.body_string().await?;
    let submission = payout_submission(&FormBody::parse(&body)).map_err(http_error)?;

    let bulk_pay = req.state().bulk_pay.clone();
    let outcome = bulk_pay
        .submit(&mut selection, submission)
        .await
        .map_err(http_error)?;

    match outcome {
        SubmitOutcome::RedirectBack => Ok(redirect(BANK_ACCOUNTS_PATH)),
        SubmitOutcome::Invalid(formset) => Ok(html(views::bulk_pay(&formset))),
        SubmitOutcome::Completed { notice, credits } => {
            info!("admin issued {} payouts", credits.len());
            save_selection(&mut req, selection)?;
            push_notice(&mut req, notice)?;
            Ok(redirect(BANK_ACCOUNTS_PATH))
        }
        SubmitOutcome::Cancelled { notice } => {
            save_selection(&mut req, selection)?;
            push_notice(&mut req, notice)?;
            Ok(redirect(BANK_ACCOUNTS_PATH))
        }
    }
}
