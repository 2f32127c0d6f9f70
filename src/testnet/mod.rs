//! Shared helpers for unit tests

pub mod test_utils;

pub use test_utils::{ballot_txn, create_memory_chain, create_sled_chain, mine_next_block};
