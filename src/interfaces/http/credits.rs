use super::forms::{credit_add_data, FormBody};
use super::views;
use super::{html, http_error, push_notice, redirect, take_notices, State, CREDITS_PATH};
use crate::application::payouts::CreditAddForm;
use tide::Request;

pub async fn list(mut req: Request<State>) -> tide::Result {
    let notices = take_notices(&mut req);
    let state = req.state();
    let credits = state
        .mirror
        .stores()
        .credits
        .get_all()
        .await
        .map_err(http_error)?;
    Ok(html(views::credit_list(&credits, &notices, &state.config)))
}

pub async fn add_form(req: Request<State>) -> tide::Result {
    let bank_accounts = req
        .state()
        .mirror
        .stores()
        .bank_accounts
        .get_all()
        .await
        .map_err(http_error)?;
    let form = CreditAddForm::unbound();
    Ok(html(views::credit_add(form.data(), form.errors(), &bank_accounts)))
}

/// Single payout. Escrow is checked before the credit is issued.
pub async fn add(mut req: Request<State>) -> tide::Result {
    let body = req.body_string().await?;
    let data = credit_add_data(&FormBody::parse(&body));
    let mirror = req.state().mirror.clone();

    let form = CreditAddForm::bind(data, &mirror).await.map_err(http_error)?;
    if !form.is_valid() {
        let bank_accounts = mirror
            .stores()
            .bank_accounts
            .get_all()
            .await
            .map_err(http_error)?;
        return Ok(html(views::credit_add(form.data(), form.errors(), &bank_accounts)));
    }

    let credit = form.save(&mirror).await.map_err(http_error)?;
    push_notice(
        &mut req,
        format!("The credit \"{}\" was added successfully.", credit.uri),
    )?;
    Ok(redirect(CREDITS_PATH))
}
