use crate::core::Block;
use crate::error::{ChainError, Result};
use crate::utils::{serialize, sha256_digest};
use log::error;
use num_bigint::{BigInt, Sign};
use std::borrow::Borrow;
use std::ops::ShlAssign;

/// Global difficulty: a valid digest must have this many leading zero bits.
/// Low enough that miners (and tests) converge quickly.
pub const TARGET_BITS: u32 = 12;

const MAX_NONCE: u32 = u32::MAX;

pub struct ProofOfWork {
    block: Block,
    target: BigInt,
}

impl ProofOfWork {
    pub fn new_proof(block: Block) -> ProofOfWork {
        let mut target = BigInt::from(1);
        target.shl_assign(256 - TARGET_BITS);
        ProofOfWork { block, target }
    }

    /// Validate a block's stored nonce and hash against the target.
    ///
    /// The digest is recomputed from the block's own fields, so this also
    /// catches a block whose hash field was tampered with after mining.
    pub fn validate(block: &Block) -> bool {
        let pow = ProofOfWork::new_proof(block.clone());
        let data = match pow.prepare_data(block.get_nonce()) {
            Ok(data) => data,
            Err(e) => {
                error!("Unable to prepare proof-of-work data: {e}");
                return false;
            }
        };
        let hash = sha256_digest(data.as_slice());
        let hash_int = BigInt::from_bytes_be(Sign::Plus, hash.as_slice());

        hash_int < pow.target && hash.as_slice() == block.get_hash()
    }

    // Digest preimage: prev_hash || txns || block_num || nonce || miner_id.
    // The hash field itself stays out, it is the result.
    fn prepare_data(&self, nonce: u32) -> Result<Vec<u8>> {
        let txn_bytes = serialize(&self.block.get_txns().to_vec())?;
        let mut data_bytes = vec![];
        data_bytes.extend(self.block.get_prev_hash());
        data_bytes.extend(txn_bytes);
        data_bytes.push(self.block.get_block_num());
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes.extend(self.block.get_miner_id().as_bytes());
        Ok(data_bytes)
    }

    /// Search the nonce space until the digest meets the target.
    pub fn run(&self) -> Result<(u32, Vec<u8>)> {
        let mut nonce = 0u32;
        loop {
            let data = self.prepare_data(nonce)?;
            let hash = sha256_digest(data.as_slice());
            let hash_int = BigInt::from_bytes_be(Sign::Plus, hash.as_slice());

            if hash_int.lt(self.target.borrow()) {
                return Ok((nonce, hash));
            }
            if nonce == MAX_NONCE {
                break;
            }
            nonce += 1;
        }
        Err(ChainError::Crypto(
            "proof-of-work nonce space exhausted".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Ballot, Transaction};

    fn mined_block() -> Block {
        let txn = Transaction::new_ballot(
            Ballot::new("alice", "11112222", "candidate-a"),
            vec![],
            vec![],
        )
        .unwrap();
        Block::new_block(vec![0xAB; 32], &[txn], 1, "miner-1").unwrap()
    }

    #[test]
    fn test_mined_block_validates() {
        let block = mined_block();
        assert!(ProofOfWork::validate(&block));
    }

    #[test]
    fn test_validate_rejects_wrong_nonce() {
        let block = mined_block();
        let tampered = Block::new_test_block(
            block.get_prev_hash().to_vec(),
            block.get_block_num(),
            block.get_nonce().wrapping_add(1),
            block.get_txns(),
            block.get_miner_id(),
            block.get_hash_bytes(),
        );
        assert!(!ProofOfWork::validate(&tampered));
    }

    #[test]
    fn test_validate_rejects_foreign_hash() {
        // A hash that meets the target but was mined over different fields
        // must not validate.
        let block = mined_block();
        let other = Block::new_block(vec![0xCD; 32], block.get_txns(), 2, "miner-2").unwrap();
        let tampered = Block::new_test_block(
            block.get_prev_hash().to_vec(),
            block.get_block_num(),
            block.get_nonce(),
            block.get_txns(),
            block.get_miner_id(),
            other.get_hash_bytes(),
        );
        assert!(!ProofOfWork::validate(&tampered));
    }

    #[test]
    fn test_prepare_data_consistency() {
        let block = mined_block();
        let pow = ProofOfWork::new_proof(block);

        let data1 = pow.prepare_data(12345).unwrap();
        let data2 = pow.prepare_data(12345).unwrap();
        assert_eq!(data1, data2);

        let data3 = pow.prepare_data(54321).unwrap();
        assert_ne!(data1, data3);
    }

    #[test]
    fn test_genesis_mined_under_same_rule() {
        let genesis = Block::genesis().unwrap();
        assert!(ProofOfWork::validate(&genesis));
    }
}
