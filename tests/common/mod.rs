#![allow(dead_code)]

use balanced_mirror::application::mirror::Mirror;
use balanced_mirror::domain::bank_account::{BankAccount, BankAccountType, NewBankAccount};
use balanced_mirror::domain::money::MinorUnits;
use balanced_mirror::domain::user::UserId;
use balanced_mirror::infrastructure::in_memory::{in_memory_stores, InMemoryGateway};
use std::sync::Arc;

/// An in-memory payments API plus a mirror over fresh in-memory tables.
pub struct Harness {
    pub gateway: Arc<InMemoryGateway>,
    pub mirror: Arc<Mirror>,
}

impl Harness {
    pub fn with_escrow(cents: i64) -> Self {
        let gateway = Arc::new(InMemoryGateway::with_escrow(MinorUnits(cents)));
        let mirror = Arc::new(Mirror::new(gateway.clone(), in_memory_stores()));
        Self { gateway, mirror }
    }

    pub async fn bank_account(&self, name: &str) -> BankAccount {
        self.mirror
            .create_bank_account(new_bank_account(name, None))
            .await
            .unwrap()
    }

    pub async fn credit_count(&self) -> usize {
        self.mirror.stores().credits.get_all().await.unwrap().len()
    }
}

pub fn new_bank_account(name: &str, user_id: Option<UserId>) -> NewBankAccount {
    NewBankAccount {
        user_id,
        name: name.to_string(),
        account_number: "123123123".to_string(),
        routing_number: "321174851".to_string(),
        account_type: BankAccountType::Checking,
    }
}
