//! # Ballotchain - Proof-of-Work Voting Chain Core
//!
//! The blockchain engine behind a small distributed voting system. Voters
//! submit signed ballots to miners, miners mine blocks of ballots, and a
//! coordinator mints genesis and answers confirmation/tally queries. This
//! crate is the part all of those processes share.
//!
//! ## What's Here
//! - **Chain engine**: content-addressed block store, tip tracking, and the
//!   admission pipeline (sanity, parent, duplicate, proof-of-work)
//! - **Ballot transactions**: UTXO-style inputs/outputs with ECDSA P-256
//!   signatures over trimmed transaction copies
//! - **Fork reconciliation**: transaction diff between any two tips, so a
//!   miner can switch branches without losing or double-counting ballots
//! - **Chain iterator**: walks any tip back to genesis, driving the
//!   confirmation-depth and unspent-output queries
//!
//! ## How the Code Is Organized
//! - `core/`: blocks, transactions, the chain engine, proof-of-work
//! - `storage/`: the key/value substrate and the block store on top of it
//! - `wallet/`: voter key pairs and public-key hashing
//! - `config/`: process-level settings (data directory, miner identity)
//! - `utils/`: hashing, signing, and serialization helpers
//! - `error/`: the crate-wide error type
//!
//! ## Key Design Decisions
//! - Sled as the embedded store, behind a small `KvStore` trait so tests
//!   can run in memory
//! - Bincode's standard configuration as the one wire encoding, on disk
//!   and between peers; content hashes are computed over it
//! - Admission never picks the longest chain; the miner decides when to
//!   switch forks and reassigns the tip after `checkout_fork`
//! - Peer blocks that fail validation are logged and dropped, never fatal

pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use crate::config::{Config, GLOBAL_CONFIG};
pub use crate::core::{
    Ballot, Block, Blockchain, ChainIterator, ProofOfWork, Transaction, TxInput, TxOutput,
    COORD_MINER_ID, TARGET_BITS,
};
pub use crate::error::{ChainError, Result};
pub use crate::storage::{ChainStore, KvStore, MemoryStore, SledStore};
pub use crate::utils::{
    ecdsa_p256_public_key, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, ripemd160_digest, sha256_digest,
};
pub use crate::wallet::{hash_pub_key, Wallet};
