// Content-addressed block persistence. This file owns the key layout:
// "LastHash" points at the current tip, "block-" || hash holds the encoded
// block. Callers never see these names.

use crate::error::{ChainError, Result};
use crate::storage::KvStore;
use std::sync::Arc;

const LAST_HASH_KEY: &[u8] = b"LastHash";
const BLOCK_KEY_PREFIX: &[u8] = b"block-";

/// Persistent mapping `hash -> encoded block` plus the tip pointer.
#[derive(Clone)]
pub struct ChainStore {
    kv: Arc<dyn KvStore>,
}

impl ChainStore {
    pub fn new(kv: Arc<dyn KvStore>) -> ChainStore {
        ChainStore { kv }
    }

    fn block_key(hash: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(BLOCK_KEY_PREFIX.len() + hash.len());
        key.extend(BLOCK_KEY_PREFIX);
        key.extend(hash);
        key
    }

    /// Whether a genesis block has already been installed.
    pub fn is_initialized(&self) -> Result<bool> {
        self.kv.key_exist(LAST_HASH_KEY)
    }

    pub fn last_hash(&self) -> Result<Vec<u8>> {
        self.kv
            .get(LAST_HASH_KEY)?
            .ok_or_else(|| ChainError::NotFound("last hash".to_string()))
    }

    pub fn block_exists(&self, hash: &[u8]) -> Result<bool> {
        self.kv.key_exist(&Self::block_key(hash))
    }

    pub fn get_block_bytes(&self, hash: &[u8]) -> Result<Vec<u8>> {
        self.kv
            .get(&Self::block_key(hash))?
            .ok_or_else(|| ChainError::NotFound("block".to_string()))
    }

    pub fn put_block_bytes(&self, hash: &[u8], bytes: &[u8]) -> Result<()> {
        self.kv.put(&Self::block_key(hash), bytes)
    }

    /// Atomically install the genesis block together with the tip pointer.
    pub fn install_genesis(&self, hash: &[u8], bytes: &[u8]) -> Result<()> {
        self.kv.put_multi(&[
            (Self::block_key(hash), bytes.to_vec()),
            (LAST_HASH_KEY.to_vec(), hash.to_vec()),
        ])
    }

    /// Atomically install a set of pre-validated blocks and the tip pointer.
    pub fn install_snapshot(&self, blocks: &[(Vec<u8>, Vec<u8>)], last_hash: &[u8]) -> Result<()> {
        let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = blocks
            .iter()
            .map(|(hash, bytes)| (Self::block_key(hash), bytes.clone()))
            .collect();
        pairs.push((LAST_HASH_KEY.to_vec(), last_hash.to_vec()));
        self.kv.put_multi(&pairs)
    }

    /// Encoded bytes of every stored block, for ship-to-peer snapshots.
    pub fn all_block_bytes(&self) -> Result<Vec<Vec<u8>>> {
        self.kv.get_all_with_prefix(BLOCK_KEY_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> ChainStore {
        ChainStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_uninitialized_store() {
        let store = store();
        assert!(!store.is_initialized().unwrap());
        assert!(store.last_hash().is_err());
    }

    #[test]
    fn test_install_genesis_sets_tip() {
        let store = store();
        store.install_genesis(b"g", b"genesis-bytes").unwrap();

        assert!(store.is_initialized().unwrap());
        assert_eq!(store.last_hash().unwrap(), b"g".to_vec());
        assert!(store.block_exists(b"g").unwrap());
        assert_eq!(store.get_block_bytes(b"g").unwrap(), b"genesis-bytes");
    }

    #[test]
    fn test_snapshot_install() {
        let store = store();
        store
            .install_snapshot(
                &[
                    (b"g".to_vec(), b"one".to_vec()),
                    (b"h".to_vec(), b"two".to_vec()),
                ],
                b"h",
            )
            .unwrap();

        assert_eq!(store.last_hash().unwrap(), b"h".to_vec());
        assert_eq!(store.all_block_bytes().unwrap().len(), 2);
    }
}
