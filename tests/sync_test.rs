mod common;

use balanced_mirror::application::sync::{SyncTarget, Synchronizer};
use balanced_mirror::domain::account::Account;
use balanced_mirror::domain::bank_account::{BankAccount, BankAccountType};
use balanced_mirror::domain::money::{Amount, MinorUnits};
use balanced_mirror::domain::ports::{MirrorStores, PaymentGateway};
use balanced_mirror::domain::remote::{NewRemoteAccount, NewRemoteCredit};
use balanced_mirror::domain::resource::ResourceKind;
use balanced_mirror::domain::user::UserId;
use balanced_mirror::infrastructure::in_memory::{in_memory_stores, InMemoryGateway};
use common::new_bank_account;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn synchronizer(gateway: &Arc<InMemoryGateway>) -> (Synchronizer, MirrorStores) {
    let stores = in_memory_stores();
    (Synchronizer::new(gateway.clone(), stores.clone()), stores)
}

#[tokio::test]
async fn test_sync_creates_then_updates_without_duplicates() {
    let gateway = Arc::new(InMemoryGateway::new());
    for name in ["alice", "bob"] {
        gateway
            .create_bank_account(new_bank_account(name, None).creation_payload())
            .await
            .unwrap();
    }
    let (synchronizer, stores) = synchronizer(&gateway);

    let first = synchronizer.sync(ResourceKind::BankAccounts).await.unwrap();
    assert_eq!((first.created, first.updated), (2, 0));

    let second = synchronizer.sync(ResourceKind::BankAccounts).await.unwrap();
    assert_eq!((second.created, second.updated), (0, 2));
    assert_eq!(stores.bank_accounts.get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_sync_overwrites_local_fields() {
    let gateway = Arc::new(InMemoryGateway::new());
    let remote = gateway
        .create_bank_account(new_bank_account("alice", None).creation_payload())
        .await
        .unwrap();
    let (synchronizer, stores) = synchronizer(&gateway);

    let mut stale = BankAccount::from_remote(&remote, Some(UserId(9)));
    stale.name = "stale".to_string();
    stale.bank_name = "OLD BANK".to_string();
    stores.bank_accounts.store(stale).await.unwrap();
    gateway
        .edit_bank_account(&remote.uri, |b| b.account_type = BankAccountType::Savings)
        .await
        .unwrap();

    synchronizer.sync(ResourceKind::BankAccounts).await.unwrap();

    let synced = stores.bank_accounts.get(&remote.uri).await.unwrap().unwrap();
    assert_eq!(synced.name, "alice");
    assert_eq!(synced.bank_name, "SANDBOX BANK");
    assert_eq!(synced.account_type, BankAccountType::Savings);
    assert_eq!(synced.user_id, Some(UserId(9)));
}

#[tokio::test]
async fn test_sync_credits_resolves_bank_account_and_owner() {
    let gateway = Arc::new(InMemoryGateway::with_escrow(MinorUnits(10000)));
    let known = gateway
        .create_bank_account(new_bank_account("alice", None).creation_payload())
        .await
        .unwrap();
    let credit = NewRemoteCredit {
        amount: MinorUnits(1250),
        description: Some("payout".to_string()),
        appears_on_statement_as: None,
    };
    let remote_credit = gateway.create_credit(&known.uri, credit.clone()).await.unwrap();

    let (synchronizer, stores) = synchronizer(&gateway);
    stores
        .bank_accounts
        .store(BankAccount::from_remote(&known, Some(UserId(3))))
        .await
        .unwrap();
    let unknown = gateway
        .create_bank_account(new_bank_account("bob", None).creation_payload())
        .await
        .unwrap();
    gateway.create_credit(&unknown.uri, credit).await.unwrap();

    let report = synchronizer.sync(ResourceKind::Credits).await.unwrap();
    assert_eq!((report.created, report.skipped), (1, 1));

    let mirrored = stores.credits.get(&remote_credit.uri).await.unwrap().unwrap();
    assert_eq!(mirrored.bank_account, known.uri);
    assert_eq!(mirrored.user_id, Some(UserId(3)));
    assert_eq!(mirrored.amount, Amount::new(dec!(12.50)).unwrap());
}

#[tokio::test]
async fn test_sync_all_resolves_cards_through_accounts() {
    let gateway = Arc::new(InMemoryGateway::new());
    let remote_account = gateway
        .create_account(NewRemoteAccount {
            name: "john".to_string(),
        })
        .await
        .unwrap();
    let token = gateway.tokenize_card("4111111111111111", 12, 2030).await;
    gateway.add_card(&remote_account.uri, &token).await.unwrap();
    gateway
        .create_account(NewRemoteAccount {
            name: "orphan".to_string(),
        })
        .await
        .unwrap();

    let (synchronizer, stores) = synchronizer(&gateway);
    stores
        .accounts
        .store(Account::from_remote(&remote_account, UserId(1)))
        .await
        .unwrap();

    let reports = synchronizer.run(SyncTarget::All).await.unwrap();
    let accounts = reports.iter().find(|r| r.kind == ResourceKind::Accounts).unwrap();
    assert_eq!((accounts.updated, accounts.skipped), (1, 1));

    let cards = stores.cards.get_all().await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].user_id, UserId(1));
    assert_eq!(cards[0].last_four, "1111");
    assert_eq!(reports.len(), ResourceKind::ALL.len());
}
