//! Test utilities for chain testing

use crate::core::{Ballot, Block, Blockchain, Transaction};
use crate::error::Result;
use crate::storage::{MemoryStore, SledStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Create an initialized chain backed by an in-memory store.
pub fn create_memory_chain() -> Result<Blockchain> {
    let chain = Blockchain::new(Arc::new(MemoryStore::new()));
    chain.init()?;
    Ok(chain)
}

/// Create an initialized chain backed by sled in a temporary directory.
pub fn create_sled_chain() -> Result<(Blockchain, TempDir)> {
    let temp_dir = tempfile::tempdir().map_err(|e| crate::error::ChainError::Io(e.to_string()))?;
    let store = SledStore::open(temp_dir.path().join("chain"))?;
    let chain = Blockchain::new(Arc::new(store));
    chain.init()?;
    Ok((chain, temp_dir))
}

/// An unsigned ballot transaction with no inputs or outputs.
pub fn ballot_txn(voter_name: &str, candidate: &str) -> Result<Transaction> {
    Transaction::new_ballot(Ballot::new(voter_name, "11112222", candidate), vec![], vec![])
}

/// Mine a block on the current tip and admit it as owned.
pub fn mine_next_block(
    chain: &Blockchain,
    txns: &[Transaction],
    miner_id: &str,
) -> Result<Block> {
    let parent_hash = chain.get_last_hash();
    let parent = chain.get(&parent_hash)?;
    let block = Block::new_block(
        parent_hash,
        txns,
        parent.get_block_num().wrapping_add(1),
        miner_id,
    )?;
    chain.put(&block, true)?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_memory_chain() {
        let chain = create_memory_chain().unwrap();
        let genesis = chain.get(&chain.get_last_hash()).unwrap();
        assert!(genesis.is_genesis());
    }

    #[test]
    fn test_mine_next_block_advances_tip() {
        let chain = create_memory_chain().unwrap();
        let txn = ballot_txn("alice", "candidate-a").unwrap();
        let block = mine_next_block(&chain, &[txn], "miner-1").unwrap();

        assert_eq!(chain.get_last_hash(), block.get_hash_bytes());
        assert_eq!(block.get_block_num(), 1);
    }
}
