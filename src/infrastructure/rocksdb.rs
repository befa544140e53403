use crate::domain::ports::{MirrorStore, MirrorStores};
use crate::domain::resource::{Mirrored, ResourceKind, ResourceUri};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// A persistent store implementation using RocksDB.
///
/// Each mirrored kind lives in its own Column Family named after its table
/// (`balanced_bank_accounts`, ...). Keys are resource URIs, values are the
/// JSON-encoded records.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that one column family per mirrored kind exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = ResourceKind::ALL
            .iter()
            .map(|kind| ColumnFamilyDescriptor::new(kind.table(), Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Every mirrored table, backed by this database.
    pub fn stores(&self) -> MirrorStores {
        MirrorStores {
            accounts: Arc::new(self.clone()),
            bank_accounts: Arc::new(self.clone()),
            cards: Arc::new(self.clone()),
            credits: Arc::new(self.clone()),
            debits: Arc::new(self.clone()),
        }
    }

    fn table(&self, kind: ResourceKind) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(kind.table()).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                kind.table()
            ))))
        })
    }
}

#[async_trait]
impl<T: Mirrored> MirrorStore<T> for RocksDBStore {
    async fn store(&self, record: T) -> Result<()> {
        let cf = self.table(T::KIND)?;
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(cf, record.uri().as_str().as_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, uri: &ResourceUri) -> Result<Option<T>> {
        let cf = self.table(T::KIND)?;
        match self.db.get_pinned_cf(cf, uri.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        let cf = self.table(T::KIND)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    async fn remove(&self, uri: &ResourceUri) -> Result<()> {
        let cf = self.table(T::KIND)?;
        self.db.delete_cf(cf, uri.as_str().as_bytes())?;
        Ok(())
    }
}
