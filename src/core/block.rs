use crate::core::{ProofOfWork, Transaction};
use crate::error::Result;
use crate::utils::{deserialize, serialize};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Miner identity recorded on the genesis block. Genesis is minted by the
/// coordinator, never by a miner.
pub const COORD_MINER_ID: &str = "Coord";

/// One block of the voting chain.
///
/// `hash` is the proof-of-work digest over the remaining fields, so a block
/// is immutable once mined: changing anything invalidates the hash, and the
/// hash is the storage key.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    prev_hash: Vec<u8>,
    block_num: u8,
    nonce: u32,
    txns: Vec<Transaction>,
    miner_id: String,
    hash: Vec<u8>,
}

impl Block {
    /// Mine a new block on top of `prev_hash`.
    ///
    /// Block numbers are 8-bit and wrap at 255; chains here are never
    /// expected to grow that far.
    pub fn new_block(
        prev_hash: Vec<u8>,
        txns: &[Transaction],
        block_num: u8,
        miner_id: &str,
    ) -> Result<Block> {
        let mut block = Block {
            prev_hash,
            block_num,
            nonce: 0,
            txns: txns.to_vec(),
            miner_id: miner_id.to_string(),
            hash: vec![],
        };

        let pow = ProofOfWork::new_proof(block.clone());
        let (nonce, hash) = pow.run()?;
        block.nonce = nonce;
        block.hash = hash;
        Ok(block)
    }

    /// Mint the genesis block. For coordinator use only.
    pub fn genesis() -> Result<Block> {
        Block::new_block(vec![], &[], 0, COORD_MINER_ID)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_prev_hash(&self) -> &[u8] {
        self.prev_hash.as_slice()
    }

    pub fn get_block_num(&self) -> u8 {
        self.block_num
    }

    pub fn get_nonce(&self) -> u32 {
        self.nonce
    }

    pub fn get_txns(&self) -> &[Transaction] {
        self.txns.as_slice()
    }

    pub fn get_miner_id(&self) -> &str {
        self.miner_id.as_str()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_hash_bytes(&self) -> Vec<u8> {
        self.hash.clone()
    }

    pub fn is_genesis(&self) -> bool {
        self.block_num == 0
    }

    /// Create a block with explicit fields, skipping mining (for testing only)
    #[cfg(test)]
    pub fn new_test_block(
        prev_hash: Vec<u8>,
        block_num: u8,
        nonce: u32,
        txns: &[Transaction],
        miner_id: &str,
        hash: Vec<u8>,
    ) -> Block {
        Block {
            prev_hash,
            block_num,
            nonce,
            txns: txns.to_vec(),
            miner_id: miner_id.to_string(),
            hash,
        }
    }
}

fn short_hex(bytes: &[u8]) -> String {
    HEXLOWER.encode(&bytes[..bytes.len().min(5)])
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block #{} ({})", self.block_num, short_hex(&self.hash))?;
        writeln!(f, "\tprev_hash:\t{}", short_hex(&self.prev_hash))?;
        writeln!(f, "\tnonce:\t\t{}", self.nonce)?;
        writeln!(f, "\tminer_id:\t{}", self.miner_id)?;
        writeln!(f, "\ttxns:\t\t{}", self.txns.len())?;
        for txn in &self.txns {
            writeln!(
                f,
                "\t    {}\t-> {}",
                txn.get_data().get_voter_name(),
                txn.get_data().get_candidate()
            )?;
        }
        Ok(())
    }
}
