// Key/value substrate behind the chain. The trait mirrors exactly what the
// chain needs from a store: point reads/writes, an atomic multi-put for
// genesis and snapshot installs, and a prefix scan for full-chain exports.

use crate::error::{ChainError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

/// Ordered key/value store capability consumed by the chain.
///
/// `put_multi` must be all-or-nothing; everything else is a plain point
/// operation. Keys are opaque binary.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Atomically write every pair, or none of them.
    fn put_multi(&self, pairs: &[(Vec<u8>, Vec<u8>)]) -> Result<()>;

    fn key_exist(&self, key: &[u8]) -> Result<bool>;

    /// Values of all keys starting with `prefix`, in key order.
    fn get_all_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>>;
}

/// Sled-backed store used by real nodes.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<SledStore> {
        let db = sled::open(path)
            .map_err(|e| ChainError::Database(format!("Failed to open database: {e}")))?;
        Ok(SledStore { db })
    }

    /// Open a store under the configured data directory.
    pub fn open_default() -> Result<SledStore> {
        Self::open(crate::config::GLOBAL_CONFIG.get_data_dir())
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .db
            .get(key)
            .map_err(|e| ChainError::Database(format!("Failed to read key: {e}")))?;
        Ok(value.map(|ivec| ivec.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .insert(key, value)
            .map_err(|e| ChainError::Database(format!("Failed to write key: {e}")))?;
        Ok(())
    }

    fn put_multi(&self, pairs: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        let mut batch = sled::Batch::default();
        for (key, value) in pairs {
            batch.insert(key.as_slice(), value.as_slice());
        }
        self.db
            .apply_batch(batch)
            .map_err(|e| ChainError::Database(format!("Failed to apply batch: {e}")))?;
        Ok(())
    }

    fn key_exist(&self, key: &[u8]) -> Result<bool> {
        self.db
            .contains_key(key)
            .map_err(|e| ChainError::Database(format!("Failed to check key: {e}")))
    }

    fn get_all_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut values = vec![];
        for item in self.db.scan_prefix(prefix) {
            let (_, value) =
                item.map_err(|e| ChainError::Database(format!("Failed to scan prefix: {e}")))?;
            values.push(value.to_vec());
        }
        Ok(values)
    }
}

/// In-memory store for tests and single-process experiments.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on memory store - this should never happen");
        Ok(inner.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on memory store - this should never happen");
        inner.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn put_multi(&self, pairs: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        // A single write-lock section makes the batch all-or-nothing.
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on memory store - this should never happen");
        for (key, value) in pairs {
            inner.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn key_exist(&self, key: &[u8]) -> Result<bool> {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on memory store - this should never happen");
        Ok(inner.contains_key(key))
    }

    fn get_all_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on memory store - this should never happen");
        Ok(inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(_, value)| value.clone())
            .collect())
    }
}
