use super::forms::{BankAccountAddData, FormBody};
use super::views::{self, BULK_PAY_ACTION, DELETE_ACTION};
use super::{
    html, http_error, load_selection, push_notice, redirect, save_selection, take_notices, State,
    BANK_ACCOUNTS_PATH, BULK_PAY_PATH,
};
use crate::application::payouts::{FormErrors, NOTHING_SELECTED};
use crate::domain::resource::ResourceUri;
use crate::error::PaymentError;
use log::info;
use tide::Request;

pub async fn list(mut req: Request<State>) -> tide::Result {
    let notices = take_notices(&mut req);
    let state = req.state();
    let bank_accounts = state
        .mirror
        .stores()
        .bank_accounts
        .get_all()
        .await
        .map_err(http_error)?;
    Ok(html(views::bank_account_list(&bank_accounts, &notices, &state.config)))
}

/// Runs a list action on the checked rows.
pub async fn action(mut req: Request<State>) -> tide::Result {
    let body = req.body_string().await?;
    let form = FormBody::parse(&body);
    let selected: Vec<ResourceUri> = form
        .get_all("selected")
        .into_iter()
        .map(ResourceUri::from)
        .collect();

    match form.get("action").unwrap_or_default() {
        BULK_PAY_ACTION => {
            let mut selection = load_selection(&req);
            let bulk_pay = req.state().bulk_pay.clone();
            match bulk_pay.select(&mut selection, selected) {
                Ok(()) => {
                    save_selection(&mut req, selection)?;
                    Ok(redirect(BULK_PAY_PATH))
                }
                Err(err) => {
                    push_notice(&mut req, validation_text(err))?;
                    Ok(redirect(BANK_ACCOUNTS_PATH))
                }
            }
        }
        DELETE_ACTION => {
            let mirror = req.state().mirror.clone();
            for uri in &selected {
                mirror.delete_bank_account(uri).await.map_err(http_error)?;
            }
            let notice = match selected.len() {
                0 => NOTHING_SELECTED.to_string(),
                1 => "Successfully deleted 1 bank account.".to_string(),
                n => format!("Successfully deleted {} bank accounts.", n),
            };
            push_notice(&mut req, notice)?;
            Ok(redirect(BANK_ACCOUNTS_PATH))
        }
        _ => {
            push_notice(&mut req, "No action selected.")?;
            Ok(redirect(BANK_ACCOUNTS_PATH))
        }
    }
}

pub async fn add_form(_req: Request<State>) -> tide::Result {
    Ok(html(views::bank_account_add(
        &BankAccountAddData::default(),
        &FormErrors::default(),
    )))
}

pub async fn add(mut req: Request<State>) -> tide::Result {
    let body = req.body_string().await?;
    let data = BankAccountAddData::from_form(&FormBody::parse(&body));
    let new = match data.validate() {
        Ok(new) => new,
        Err(errors) => return Ok(html(views::bank_account_add(&data, &errors))),
    };

    let bank_account = req
        .state()
        .mirror
        .create_bank_account(new)
        .await
        .map_err(http_error)?;
    info!("admin added bank account {}", bank_account.uri);
    push_notice(
        &mut req,
        format!("The bank account \"{}\" was added successfully.", bank_account),
    )?;
    Ok(redirect(BANK_ACCOUNTS_PATH))
}

fn validation_text(err: PaymentError) -> String {
    match err {
        PaymentError::ValidationError(message) => message,
        other => other.to_string(),
    }
}
