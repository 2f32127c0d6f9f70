// The chain engine. Blocks live in a content-addressed store; the only
// mutable state is the tip pointer. Admission extends the tip when a block
// chains directly onto it and files everything else as a side branch.
// Longest-chain selection belongs to the miner, which diffs forks with
// checkout_fork and then reassigns the tip explicitly.

use crate::config::GLOBAL_CONFIG;
use crate::core::{Block, ProofOfWork, Transaction};
use crate::error::{ChainError, Result};
use crate::storage::{ChainStore, KvStore};
use data_encoding::HEXLOWER;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The blockchain engine: tip pointer plus a read-only handle to the store.
///
/// The `RwLock` around the tip is the single lock of the design. Admission
/// and explicit tip reassignment hold it for writing across their whole
/// check-persist-update sequence; readers only hold it long enough to copy
/// the tip hash, because stored blocks never change.
#[derive(Clone)]
pub struct Blockchain {
    last_hash: Arc<RwLock<Vec<u8>>>,
    store: ChainStore,
}

impl Blockchain {
    pub fn new(kv: Arc<dyn KvStore>) -> Blockchain {
        Blockchain {
            last_hash: Arc::new(RwLock::new(vec![])),
            store: ChainStore::new(kv),
        }
    }

    /// Initialize a fresh chain with a newly mined genesis block.
    /// For coordinator use only.
    pub fn init(&self) -> Result<()> {
        if self.store.is_initialized()? {
            return Err(ChainError::AlreadyInitialized);
        }

        let genesis = Block::genesis()?;
        self.store
            .install_genesis(genesis.get_hash(), &genesis.serialize()?)?;

        info!(
            "Genesis block minted: {}",
            HEXLOWER.encode(genesis.get_hash())
        );
        self.set_last_hash(genesis.get_hash());
        Ok(())
    }

    /// Resume a chain whose blocks are already on disk.
    /// For coordinator use only.
    pub fn resume_from_db(&self) -> Result<()> {
        let last_hash = self.store.last_hash()?;
        self.set_last_hash(&last_hash);
        Ok(())
    }

    /// Install encoded blocks shipped by a peer, then adopt its tip.
    /// Blocks are trusted as pre-validated; admission checks are skipped.
    /// For miner use only.
    pub fn resume_from_encoded_data(&self, blocks: &[Vec<u8>], last_hash: &[u8]) -> Result<()> {
        let mut pairs = Vec::with_capacity(blocks.len());
        for bytes in blocks {
            let block = Block::deserialize(bytes)?;
            pairs.push((block.get_hash_bytes(), bytes.clone()));
        }
        self.store.install_snapshot(&pairs, last_hash)?;
        self.set_last_hash(last_hash);
        Ok(())
    }

    /// Snapshot every stored block plus the tip, for shipping to a peer.
    pub fn encode(&self) -> Result<(Vec<Vec<u8>>, Vec<u8>)> {
        let blocks = self.store.all_block_bytes()?;
        Ok((blocks, self.get_last_hash()))
    }

    pub fn get_last_hash(&self) -> Vec<u8> {
        self.last_hash
            .read()
            .expect("Failed to acquire read lock on last_hash - this should never happen")
            .clone()
    }

    /// Reassign the tip. Fork-checkout callers use this after reconciling;
    /// the new tip must already be a stored block.
    pub fn set_last_hash(&self, new_last_hash: &[u8]) {
        let mut last_hash = self
            .last_hash
            .write()
            .expect("Failed to acquire write lock on last_hash - this should never happen");
        *last_hash = new_last_hash.to_vec();
    }

    /// Whether a block with this hash is stored (on any branch).
    pub fn exist(&self, hash: &[u8]) -> Result<bool> {
        self.store.block_exists(hash)
    }

    /// Fetch and decode a stored block. Absence is an error here; use
    /// `exist` first when absence is expected.
    pub fn get(&self, hash: &[u8]) -> Result<Block> {
        let bytes = self.store.get_block_bytes(hash)?;
        Block::deserialize(&bytes)
    }

    /// Admit a block mined by this node (`owned`) or received from a peer.
    ///
    /// Returns false and leaves all state untouched when the block fails
    /// sanity, parent-existence, duplicate, or proof-of-work checks. The tip
    /// only advances when the block chains directly onto it; otherwise the
    /// block is stored on a side branch.
    pub fn put(&self, block: &Block, owned: bool) -> Result<bool> {
        // Writer lock for the whole sequence so concurrent admissions cannot
        // both observe prev_hash == last_hash and race the tip.
        let mut last_hash = self
            .last_hash
            .write()
            .expect("Failed to acquire write lock on last_hash - this should never happen");

        if block.get_prev_hash().is_empty()
            || block.get_block_num() == 0
            || block.get_hash().is_empty()
            || block.get_miner_id().is_empty()
        {
            warn!("Block has missing values and will not be added to the chain.");
            return Ok(false);
        }
        if !self.store.block_exists(block.get_prev_hash())? {
            warn!("Previous block does not exist and the block will not be added to the chain.");
            return Ok(false);
        }
        if self.store.block_exists(block.get_hash())? {
            warn!("Block already exists and will not be added to the chain.");
            return Ok(false);
        }

        if !owned && !ProofOfWork::validate(block) {
            warn!("Block failed proof-of-work validation and will not be added to the chain.");
            return Ok(false);
        }

        self.store
            .put_block_bytes(block.get_hash(), &block.serialize()?)?;

        if block.get_prev_hash() == last_hash.as_slice() {
            *last_hash = block.get_hash_bytes();
        }
        Ok(true)
    }

    /// Mine the next block on the current tip with this node's miner id and
    /// admit it. Block numbers wrap at 255, as the 8-bit field dictates.
    pub fn mine_block(&self, txns: &[Transaction]) -> Result<Block> {
        let miner_id = GLOBAL_CONFIG
            .get_miner_id()
            .ok_or_else(|| ChainError::Config("MINER_ID is not set".to_string()))?;

        let parent_hash = self.get_last_hash();
        let parent = self.get(&parent_hash)?;
        let block = Block::new_block(
            parent_hash,
            txns,
            parent.get_block_num().wrapping_add(1),
            &miner_id,
        )?;

        if !self.put(&block, true)? {
            warn!("Freshly mined block was not admitted to the chain.");
        }
        Ok(block)
    }

    pub fn iterator(&self, hash: &[u8]) -> ChainIterator {
        ChainIterator::new(hash.to_vec(), self.clone())
    }

    /// Number of blocks confirming the given transaction: 0 means the tip
    /// block, -1 means not found on the current chain.
    pub fn txn_status(&self, txid: &[u8]) -> Result<i32> {
        let mut iter = self.iterator(&self.get_last_hash());
        loop {
            let (block, end) = iter.next()?;
            if block.get_txns().iter().any(|txn| txn.get_id() == txid) {
                return Ok(iter.index());
            }
            if end {
                break;
            }
        }
        Ok(-1)
    }

    /// Look a transaction up on the current chain.
    pub fn find_transaction(&self, txid: &[u8]) -> Result<Transaction> {
        let mut iter = self.iterator(&self.get_last_hash());
        loop {
            let (block, end) = iter.next()?;
            for txn in block.get_txns() {
                if txn.get_id() == txid {
                    return Ok(txn.clone());
                }
            }
            if end {
                break;
            }
        }
        Err(ChainError::NotFound(format!(
            "transaction {}",
            HEXLOWER.encode(txid)
        )))
    }

    /// Diff a candidate fork against the current chain.
    ///
    /// Returns `(added, removed)`: the transactions that enter the chain
    /// when switching to `new_last_hash`, and the ones that leave it. Both
    /// are in chain order. Pure; the tip is not touched. Callers re-queue
    /// `removed` minus `added` into their mempool and then call
    /// `set_last_hash` themselves.
    pub fn checkout_fork(
        &self,
        new_last_hash: &[u8],
    ) -> Result<(Vec<Transaction>, Vec<Transaction>)> {
        let old_last_hash = self.get_last_hash();
        if new_last_hash == old_last_hash.as_slice() {
            warn!("Attempting to checkout the current fork");
            return Ok((vec![], vec![]));
        }

        let hashes_new = self.collect_hashes_to_genesis(new_last_hash)?;
        let hashes_old = self.collect_hashes_to_genesis(&old_last_hash)?;

        // First index past the shared prefix.
        let mut i = 0;
        while i < hashes_new.len().min(hashes_old.len()) && hashes_new[i] == hashes_old[i] {
            i += 1;
        }

        let added = self.collect_txns(&hashes_new[i..])?;
        let removed = self.collect_txns(&hashes_old[i..])?;
        Ok((added, removed))
    }

    // Block hashes from genesis up to `tip`, genesis first.
    fn collect_hashes_to_genesis(&self, tip: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut hashes = vec![];
        let mut iter = self.iterator(tip);
        loop {
            let (block, end) = iter.next()?;
            hashes.push(block.get_hash_bytes());
            if end {
                break;
            }
        }
        hashes.reverse();
        Ok(hashes)
    }

    fn collect_txns(&self, hashes: &[Vec<u8>]) -> Result<Vec<Transaction>> {
        let mut txns = vec![];
        for hash in hashes {
            let block = self.get(hash)?;
            txns.extend(block.get_txns().iter().cloned());
        }
        Ok(txns)
    }

    /// Sign a transaction against the chain it spends from. A referenced
    /// transaction missing from the chain is a caller bug and fails hard.
    pub fn sign_transaction(&self, tx: &mut Transaction, pkcs8: &[u8]) -> Result<()> {
        let mut prev_txs = HashMap::new();
        for vin in tx.get_vin() {
            let prev_tx = self.find_transaction(vin.get_txid())?;
            prev_txs.insert(HEXLOWER.encode(prev_tx.get_id()), prev_tx);
        }
        tx.sign(pkcs8, &prev_txs)
    }

    /// Verify a transaction against the chain. A missing referenced
    /// transaction makes the transaction invalid rather than the node fail.
    pub fn verify_transaction(&self, tx: &Transaction) -> Result<bool> {
        let mut prev_txs = HashMap::new();
        for vin in tx.get_vin() {
            match self.find_transaction(vin.get_txid()) {
                Ok(prev_tx) => {
                    prev_txs.insert(HEXLOWER.encode(prev_tx.get_id()), prev_tx);
                }
                Err(ChainError::NotFound(_)) => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        Ok(tx.verify(&prev_txs))
    }

    /// Transactions with at least one output locked to `pub_key_hash` that
    /// no input on the current chain has spent, tip first.
    pub fn find_unspent_transactions(&self, pub_key_hash: &[u8]) -> Result<Vec<Transaction>> {
        let mut unspent_txs: Vec<Transaction> = vec![];
        let mut spent_txos: HashMap<String, Vec<usize>> = HashMap::new();

        let mut iter = self.iterator(&self.get_last_hash());
        loop {
            let (block, end) = iter.next()?;
            for tx in block.get_txns() {
                let txid_hex = HEXLOWER.encode(tx.get_id());

                let mut emitted = false;
                for (out_idx, out) in tx.get_vout().iter().enumerate() {
                    if let Some(spent) = spent_txos.get(txid_hex.as_str()) {
                        if spent.contains(&out_idx) {
                            continue;
                        }
                    }
                    if out.is_locked_with_key(pub_key_hash) && !emitted {
                        unspent_txs.push(tx.clone());
                        emitted = true;
                    }
                }

                // Inputs of this transaction spend outputs deeper in the
                // chain; the walk reaches those later.
                for vin in tx.get_vin() {
                    let spent_hex = HEXLOWER.encode(vin.get_txid());
                    spent_txos.entry(spent_hex).or_default().push(vin.get_vout());
                }
            }
            if end {
                break;
            }
        }
        Ok(unspent_txs)
    }

    /// Accumulate spendable outputs locked to `pub_key_hash` until `amount`
    /// is covered. Returns what was accumulated (possibly short) and a map
    /// `txid -> output indices` to consume.
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(u64, HashMap<String, Vec<usize>>)> {
        let mut unspent_outputs: HashMap<String, Vec<usize>> = HashMap::new();
        let mut accumulated = 0u64;

        'work: for tx in self.find_unspent_transactions(pub_key_hash)? {
            let txid_hex = HEXLOWER.encode(tx.get_id());
            for (out_idx, out) in tx.get_vout().iter().enumerate() {
                if out.is_locked_with_key(pub_key_hash) && accumulated < amount {
                    accumulated += out.get_value();
                    unspent_outputs
                        .entry(txid_hex.clone())
                        .or_default()
                        .push(out_idx);
                    if accumulated >= amount {
                        break 'work;
                    }
                }
            }
        }
        Ok((accumulated, unspent_outputs))
    }
}

/// Walks a chain backward from a starting hash to genesis.
///
/// `index` is the depth of the last returned block: 0 for the starting
/// block, growing toward genesis. Safe to run concurrently with admissions
/// because stored blocks are immutable.
pub struct ChainIterator {
    last_hash: Vec<u8>,
    current_hash: Vec<u8>,
    index: i32,
    chain: Blockchain,
}

impl ChainIterator {
    fn new(last_hash: Vec<u8>, chain: Blockchain) -> ChainIterator {
        ChainIterator {
            current_hash: last_hash.clone(),
            last_hash,
            index: -1,
            chain,
        }
    }

    /// Return the block at the cursor and advance toward genesis. The flag
    /// is true when the returned block is genesis.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<(Block, bool)> {
        let block = self.chain.get(&self.current_hash)?;
        self.current_hash = block.get_prev_hash().to_vec();
        self.index += 1;
        let end = block.is_genesis();
        Ok((block, end))
    }

    /// Rewind to the starting hash.
    pub fn reset(&mut self) {
        self.current_hash = self.last_hash.clone();
        self.index = -1;
    }

    pub fn index(&self) -> i32 {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{ballot_txn, create_memory_chain, mine_next_block};

    #[test]
    fn test_mine_block_uses_configured_miner_id() {
        GLOBAL_CONFIG.set_miner_id("miner-42".to_string());
        let chain = create_memory_chain().unwrap();

        let txn = ballot_txn("alice", "candidate-a").unwrap();
        let block = chain.mine_block(&[txn]).unwrap();

        assert_eq!(block.get_miner_id(), "miner-42");
        assert_eq!(chain.get_last_hash(), block.get_hash_bytes());
        assert_eq!(block.get_block_num(), 1);
    }

    #[test]
    fn test_tip_is_always_a_stored_block() {
        let chain = create_memory_chain().unwrap();
        assert!(chain.exist(&chain.get_last_hash()).unwrap());

        let txn = ballot_txn("bob", "candidate-b").unwrap();
        mine_next_block(&chain, &[txn], "miner-1").unwrap();
        assert!(chain.exist(&chain.get_last_hash()).unwrap());
    }

    #[test]
    fn test_find_transaction_not_found() {
        let chain = create_memory_chain().unwrap();
        match chain.find_transaction(&[0x11; 32]) {
            Err(ChainError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
