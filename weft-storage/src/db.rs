//! HubDb - the hub's embedded ordered KV store
//!
//! Uses redb for efficient embedded storage. All rows live in the single
//! `data` table; key prefixes (see `keys`) discriminate logical tables.
//! Writers open one transaction per externally-observable state
//! transition; redb serializes them.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use thiserror::Error;

use weft_model::HubError;

/// The one table holding every hub row.
pub const TABLE_DATA: TableDefinition<&[u8], &[u8]> = TableDefinition::new("data");

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreDbError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreDbError> for HubError {
    fn from(e: StoreDbError) -> Self {
        HubError::unknown(e.to_string())
    }
}

/// Owns the redb database backing one hub replica.
pub struct HubDb {
    db: Database,
}

impl HubDb {
    /// Open or create the hub database in the given directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreDbError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        let db = Database::builder().create(dir.join("hub.db"))?;

        // Ensure the data table exists
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TABLE_DATA)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a write transaction. redb allows one writer at a time.
    pub fn begin_write(&self) -> Result<redb::WriteTransaction, StoreDbError> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction (snapshot isolation).
    pub fn begin_read(&self) -> Result<redb::ReadTransaction, StoreDbError> {
        Ok(self.db.begin_read()?)
    }

    /// Point lookup outside any caller-held transaction.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreDbError> {
        let txn = self.begin_read()?;
        let table = txn.open_table(TABLE_DATA)?;
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    /// Scan keys under a prefix in ascending order.
    /// Visitor returns Ok(true) to continue, Ok(false) to stop.
    pub fn scan_prefix<F>(&self, prefix: &[u8], mut visitor: F) -> Result<(), StoreDbError>
    where
        F: FnMut(&[u8], &[u8]) -> Result<bool, StoreDbError>,
    {
        let txn = self.begin_read()?;
        let table = txn.open_table(TABLE_DATA)?;

        let mut range = table.range(prefix..)?;
        while let Some(result) = range.next() {
            let (k_access, v_access) = result?;
            let k_bytes = k_access.value();
            if !k_bytes.starts_with(prefix) {
                break;
            }
            if !visitor(k_bytes, v_access.value())? {
                break;
            }
        }
        Ok(())
    }

    /// Count keys under a prefix.
    pub fn count_prefix(&self, prefix: &[u8]) -> Result<usize, StoreDbError> {
        let mut count = 0usize;
        self.scan_prefix(prefix, |_, _| {
            count += 1;
            Ok(true)
        })?;
        Ok(count)
    }
}
