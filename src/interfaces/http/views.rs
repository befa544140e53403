use super::forms::{field_name, management_field, BankAccountAddData, CANCEL_MARKER, MAX_NUM_FORMS};
use super::{BANK_ACCOUNTS_PATH, BANK_ACCOUNT_ADD_PATH, BULK_PAY_PATH, CREDITS_PATH, CREDIT_ADD_PATH};
use crate::application::payouts::{BulkPayoutFormSet, CreditAddData, FormErrors};
use crate::config::Config;
use crate::domain::bank_account::BankAccount;
use crate::domain::credit::Credit;
use crate::domain::user::UserId;

pub const BULK_PAY_ACTION: &str = "bulk_pay";
pub const BULK_PAY_LABEL: &str = "Credit selected accounts";
pub const DELETE_ACTION: &str = "delete_selected";
pub const DELETE_LABEL: &str = "Delete selected bank accounts";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, notices: &[String], content: &str) -> String {
    let mut messages = String::new();
    if !notices.is_empty() {
        messages.push_str("<ul class=\"messagelist\">");
        for notice in notices {
            messages.push_str(&format!("<li class=\"success\">{}</li>", escape(notice)));
        }
        messages.push_str("</ul>");
    }
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><nav><a href=\"{bank_accounts}\">Bank accounts</a> | <a href=\"{credits}\">Credits</a></nav>\
         {messages}<h1>{title}</h1>{content}</body></html>",
        title = escape(title),
        bank_accounts = BANK_ACCOUNTS_PATH,
        credits = CREDITS_PATH,
        messages = messages,
        content = content,
    )
}

fn error_list(messages: &[String]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let items: String = messages
        .iter()
        .map(|m| format!("<li>{}</li>", escape(m)))
        .collect();
    format!("<ul class=\"errorlist\">{}</ul>", items)
}

fn text_input(name: &str, value: &str, errors: &FormErrors) -> String {
    format!(
        "<p><label for=\"id_{name}\">{name}</label>{errors}\
         <input type=\"text\" id=\"id_{name}\" name=\"{name}\" value=\"{value}\"></p>",
        name = name,
        value = escape(value),
        errors = error_list(errors.field(name)),
    )
}

fn user_cell(user: Option<UserId>) -> String {
    user
        .map(|u| u.to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn bank_account_list(bank_accounts: &[BankAccount], notices: &[String], config: &Config) -> String {
    let mut rows = String::new();
    for bank_account in bank_accounts {
        rows.push_str(&format!(
            "<tr><td><input type=\"checkbox\" name=\"selected\" value=\"{uri}\"></td>\
             <td>{account_number}</td><td>{created_at}</td><td>{user}</td><td>{name}</td>\
             <td>{bank_name}</td><td>{account_type}</td><td><a href=\"{link}\">dashboard</a></td></tr>",
            uri = escape(bank_account.uri.as_str()),
            account_number = escape(&bank_account.account_number),
            created_at = bank_account.created_at.format("%Y-%m-%d %H:%M"),
            user = user_cell(bank_account.user_id),
            name = escape(&bank_account.name),
            bank_name = escape(&bank_account.bank_name),
            account_type = bank_account.account_type,
            link = escape(&config.dashboard_link(&bank_account.uri)),
        ));
    }
    let content = format!(
        "<p><a href=\"{add}\">Add bank account</a></p>\
         <form method=\"post\" action=\"{list}\">\
         <label>Action: <select name=\"action\">\
         <option value=\"\">---------</option>\
         <option value=\"{bulk_pay}\">{bulk_pay_label}</option>\
         <option value=\"{delete}\">{delete_label}</option>\
         </select></label><button type=\"submit\">Go</button>\
         <table><thead><tr><th></th><th>Account number</th><th>Created at</th><th>User</th>\
         <th>Name</th><th>Bank name</th><th>Type</th><th>Dashboard link</th></tr></thead>\
         <tbody>{rows}</tbody></table></form>",
        add = BANK_ACCOUNT_ADD_PATH,
        list = BANK_ACCOUNTS_PATH,
        bulk_pay = BULK_PAY_ACTION,
        bulk_pay_label = BULK_PAY_LABEL,
        delete = DELETE_ACTION,
        delete_label = DELETE_LABEL,
        rows = rows,
    );
    layout("Select bank account to change", notices, &content)
}

pub fn bank_account_add(data: &BankAccountAddData, errors: &FormErrors) -> String {
    let mut options = String::new();
    for choice in ["savings", "checking"] {
        let selected = if data.account_type == choice { " selected" } else { "" };
        options.push_str(&format!("<option value=\"{0}\"{1}>{0}</option>", choice, selected));
    }
    let content = format!(
        "<form method=\"post\" action=\"{action}\">{non_field}{name}{account_number}{routing_number}\
         <p><label for=\"id_type\">type</label>{type_errors}<select id=\"id_type\" name=\"type\">{options}</select></p>\
         {user}<button type=\"submit\">Save</button></form>",
        action = BANK_ACCOUNT_ADD_PATH,
        non_field = error_list(errors.non_field()),
        name = text_input("name", &data.name, errors),
        account_number = text_input("account_number", &data.account_number, errors),
        routing_number = text_input("routing_number", &data.routing_number, errors),
        type_errors = error_list(errors.field("type")),
        options = options,
        user = text_input("user", &data.user, errors),
    );
    layout("Add bank account", &[], &content)
}

/// The confirmation page: one payout row per selected bank account.
pub fn bulk_pay(formset: &BulkPayoutFormSet) -> String {
    let mut rows = String::new();
    for (i, form) in formset.forms().iter().enumerate() {
        let data = form.data();
        let errors = form.errors();
        let label = form
            .bank_account()
            .map(|b| b.to_string())
            .unwrap_or_else(|| data.bank_account.clone());
        rows.push_str(&format!(
            "<tr><td>{label}{bank_account_errors}\
             <input type=\"hidden\" name=\"{bank_account_name}\" value=\"{bank_account}\"></td>\
             <td>{amount_errors}<input type=\"number\" step=\"0.01\" min=\"0.50\" name=\"{amount_name}\" value=\"{amount}\"></td>\
             <td>{description_errors}<input type=\"text\" name=\"{description_name}\" value=\"{description}\"></td></tr>",
            label = escape(&label),
            bank_account_errors = error_list(errors.field("bank_account")),
            bank_account_name = field_name(i, "bank_account"),
            bank_account = escape(&data.bank_account),
            amount_errors = error_list(errors.field("amount")),
            amount_name = field_name(i, "amount"),
            amount = escape(&data.amount),
            description_errors = error_list(errors.field("description")),
            description_name = field_name(i, "description"),
            description = escape(&data.description),
        ));
    }
    let total = formset.forms().len();
    let content = format!(
        "<form method=\"post\" action=\"{action}\">{non_form}\
         <input type=\"hidden\" name=\"{total_name}\" value=\"{total}\">\
         <input type=\"hidden\" name=\"{initial_name}\" value=\"{total}\">\
         <input type=\"hidden\" name=\"{min_name}\" value=\"0\">\
         <input type=\"hidden\" name=\"{max_name}\" value=\"{max}\">\
         <table><thead><tr><th>Bank account</th><th>Amount</th><th>Description</th></tr></thead>\
         <tbody>{rows}</tbody></table>\
         <button type=\"submit\">Make payouts</button>\
         <button type=\"submit\" name=\"{cancel}\" value=\"1\">Cancel</button></form>",
        action = BULK_PAY_PATH,
        non_form = error_list(formset.non_form_errors()),
        total_name = management_field("TOTAL_FORMS"),
        initial_name = management_field("INITIAL_FORMS"),
        min_name = management_field("MIN_NUM_FORMS"),
        max_name = management_field("MAX_NUM_FORMS"),
        max = MAX_NUM_FORMS,
        total = total,
        rows = rows,
        cancel = CANCEL_MARKER,
    );
    layout("Confirm payouts", &[], &content)
}

pub fn credit_list(credits: &[Credit], notices: &[String], config: &Config) -> String {
    let mut rows = String::new();
    for credit in credits {
        rows.push_str(&format!(
            "<tr><td>{user}</td><td>{bank_account}</td><td>{amount}</td><td>{description}</td>\
             <td>{status}</td><td><a href=\"{link}\">dashboard</a></td></tr>",
            user = user_cell(credit.user_id),
            bank_account = escape(credit.bank_account.as_str()),
            amount = credit.amount,
            description = escape(credit.description.as_deref().unwrap_or_default()),
            status = credit.status,
            link = escape(&config.dashboard_link(&credit.uri)),
        ));
    }
    let content = format!(
        "<p><a href=\"{add}\">Add credit</a></p>\
         <table><thead><tr><th>User</th><th>Bank account</th><th>Amount</th><th>Description</th>\
         <th>Status</th><th>Dashboard link</th></tr></thead><tbody>{rows}</tbody></table>",
        add = CREDIT_ADD_PATH,
        rows = rows,
    );
    layout("Select credit to change", notices, &content)
}

pub fn credit_add(data: &CreditAddData, errors: &FormErrors, bank_accounts: &[BankAccount]) -> String {
    let mut options = String::from("<option value=\"\">---------</option>");
    for bank_account in bank_accounts {
        let uri = bank_account.uri.as_str();
        let selected = if data.bank_account == uri { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            escape(uri),
            selected,
            escape(&bank_account.to_string())
        ));
    }
    let content = format!(
        "<form method=\"post\" action=\"{action}\">{non_field}\
         <p><label for=\"id_bank_account\">bank_account</label>{bank_account_errors}\
         <select id=\"id_bank_account\" name=\"bank_account\">{options}</select></p>\
         {amount}{description}{statement_descriptor}<button type=\"submit\">Save</button></form>",
        action = CREDIT_ADD_PATH,
        non_field = error_list(errors.non_field()),
        bank_account_errors = error_list(errors.field("bank_account")),
        options = options,
        amount = text_input("amount", &data.amount, errors),
        description = text_input("description", &data.description, errors),
        statement_descriptor = text_input("statement_descriptor", &data.statement_descriptor, errors),
    );
    layout("Add credit", &[], &content)
}
