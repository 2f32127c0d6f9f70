//! Data storage and persistence
//!
//! This module provides the key/value substrate behind the chain and the
//! content-addressed block store layered on top of it.

pub mod chain_store;
pub mod kv;

pub use chain_store::ChainStore;
pub use kv::{KvStore, MemoryStore, SledStore};
