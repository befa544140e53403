//! Mirrored records, the remote resources they shadow, and the ports through
//! which the application reaches storage and the payments API.

pub mod account;
pub mod bank_account;
pub mod card;
pub mod credit;
pub mod debit;
pub mod money;
pub mod ports;
pub mod remote;
pub mod resource;
pub mod user;
