#![cfg(feature = "storage-rocksdb")]

mod common;

use balanced_mirror::application::mirror::Mirror;
use balanced_mirror::domain::money::{Amount, MinorUnits};
use balanced_mirror::domain::user::UserId;
use balanced_mirror::infrastructure::in_memory::InMemoryGateway;
use balanced_mirror::infrastructure::rocksdb::RocksDBStore;
use common::new_bank_account;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let gateway = Arc::new(InMemoryGateway::with_escrow(MinorUnits(10000)));

    // 1. First run: add a bank account and pay it
    let (bank_account, credit) = {
        let store = RocksDBStore::open(&db_path).unwrap();
        let mirror = Mirror::new(gateway.clone(), store.stores());
        let bank_account = mirror
            .create_bank_account(new_bank_account("dan carter", Some(UserId(4))))
            .await
            .unwrap();
        let credit = mirror
            .credit_bank_account(&bank_account, Amount::new(dec!(25)).unwrap(), None, None)
            .await
            .unwrap();
        (bank_account, credit)
    };

    // 2. Second run: the same DB path still holds both records
    let store = RocksDBStore::open(&db_path).unwrap();
    let mirror = Mirror::new(gateway, store.stores());

    assert_eq!(mirror.bank_account(&bank_account.uri).await.unwrap(), bank_account);
    let credits = mirror.stores().credits.get_all().await.unwrap();
    assert_eq!(credits, vec![credit]);
    assert_eq!(credits[0].user_id, Some(UserId(4)));
}
