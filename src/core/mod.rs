//! Core chain functionality
//!
//! This module contains the fundamental chain components: blocks, ballot
//! transactions, the chain engine, and proof-of-work consensus.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, COORD_MINER_ID};
pub use blockchain::{Blockchain, ChainIterator};
pub use proof_of_work::{ProofOfWork, TARGET_BITS};
pub use transaction::{Ballot, Transaction, TxInput, TxOutput};
