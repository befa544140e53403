//! Staff-only admin web surface served with `tide`.
//!
//! Handlers keep per-admin state (the payout selection and flash notices)
//! in a cookie-keyed session; everything else lives in the mirrored tables.

pub mod bank_accounts;
pub mod bulk_pay;
pub mod credits;
pub mod forms;
pub mod middleware;
pub mod views;

use crate::application::mirror::Mirror;
use crate::application::payouts::{BulkPay, PayoutSelection, SESSION_KEY};
use crate::config::Config;
use crate::error::{PaymentError, Result};
use log::error;
use middleware::StaffOnly;
use std::sync::Arc;
use tide::http::{mime, StatusCode};
use tide::sessions::{MemoryStore, SessionMiddleware};
use tide::{Redirect, Request, Response};

pub const BANK_ACCOUNTS_PATH: &str = "/admin/bank_accounts/";
pub const BANK_ACCOUNT_ADD_PATH: &str = "/admin/bank_accounts/add/";
pub const BULK_PAY_PATH: &str = "/admin/bank_accounts/bulk_pay/";
pub const CREDITS_PATH: &str = "/admin/credits/";
pub const CREDIT_ADD_PATH: &str = "/admin/credits/add/";

const MESSAGES_KEY: &str = "_messages";
const MIN_SESSION_SECRET_LEN: usize = 32;

/// Shared by every request handler.
#[derive(Clone)]
pub struct State {
    pub mirror: Arc<Mirror>,
    pub bulk_pay: BulkPay,
    pub config: Arc<Config>,
}

impl State {
    pub fn new(mirror: Arc<Mirror>, config: Config) -> Self {
        Self {
            bulk_pay: BulkPay::new(mirror.clone()),
            mirror,
            config: Arc::new(config),
        }
    }
}

/// Builds the admin server: sessions, staff check, then routes.
pub fn app(state: State) -> Result<tide::Server<State>> {
    let secret = state.config.session_secret.clone();
    if secret.len() < MIN_SESSION_SECRET_LEN {
        return Err(PaymentError::ValidationError(format!(
            "SESSION_SECRET must be at least {} bytes",
            MIN_SESSION_SECRET_LEN
        )));
    }
    let password = state.config.admin_password.clone();

    let mut app = tide::with_state(state);
    app.with(SessionMiddleware::new(MemoryStore::new(), secret.as_bytes()));
    app.with(StaffOnly::new(password));

    for path in ["/", "/admin", "/admin/"] {
        app.at(path).get(Redirect::new(BANK_ACCOUNTS_PATH));
    }
    for path in [BANK_ACCOUNTS_PATH, BANK_ACCOUNTS_PATH.trim_end_matches('/')] {
        app.at(path).get(bank_accounts::list).post(bank_accounts::action);
    }
    for path in [BANK_ACCOUNT_ADD_PATH, BANK_ACCOUNT_ADD_PATH.trim_end_matches('/')] {
        app.at(path).get(bank_accounts::add_form).post(bank_accounts::add);
    }
    for path in [BULK_PAY_PATH, BULK_PAY_PATH.trim_end_matches('/')] {
        app.at(path).get(bulk_pay::confirm).post(bulk_pay::submit);
    }
    for path in [CREDITS_PATH, CREDITS_PATH.trim_end_matches('/')] {
        app.at(path).get(credits::list);
    }
    for path in [CREDIT_ADD_PATH, CREDIT_ADD_PATH.trim_end_matches('/')] {
        app.at(path).get(credits::add_form).post(credits::add);
    }
    Ok(app)
}

/// Maps a failure to the status the admin sees.
pub(crate) fn http_error(err: PaymentError) -> tide::Error {
    let status = match &err {
        PaymentError::NotFound(_) => StatusCode::NotFound,
        PaymentError::ValidationError(_) => StatusCode::BadRequest,
        PaymentError::RemoteError(_) => StatusCode::BadGateway,
        _ => StatusCode::InternalServerError,
    };
    if status.is_server_error() {
        error!("admin request failed: {}", err);
    }
    tide::Error::new(status, err)
}

pub(crate) fn html(body: String) -> Response {
    Response::builder(StatusCode::Ok)
        .content_type(mime::HTML)
        .body(body)
        .build()
}

pub(crate) fn redirect(path: &str) -> Response {
    Redirect::new(path).into()
}

pub(crate) fn push_notice(req: &mut Request<State>, notice: impl Into<String>) -> tide::Result<()> {
    let session = req.session_mut();
    let mut notices: Vec<String> = session.get(MESSAGES_KEY).unwrap_or_default();
    notices.push(notice.into());
    session.insert(MESSAGES_KEY, notices)?;
    Ok(())
}

/// Returns and clears pending flash notices.
pub(crate) fn take_notices(req: &mut Request<State>) -> Vec<String> {
    let session = req.session_mut();
    let notices = session.get(MESSAGES_KEY).unwrap_or_default();
    session.remove(MESSAGES_KEY);
    notices
}

pub(crate) fn load_selection(req: &Request<State>) -> Option<PayoutSelection> {
    req.session().get(SESSION_KEY)
}

pub(crate) fn save_selection(req: &mut Request<State>, selection: Option<PayoutSelection>) -> tide::Result<()> {
    let session = req.session_mut();
    match selection {
        Some(selection) => session.insert(SESSION_KEY, selection)?,
        None => session.remove(SESSION_KEY),
    }
    Ok(())
}
