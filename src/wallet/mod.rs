//! Wallet management and cryptographic identity
//!
//! This module handles voter key pairs and public-key hashing. Wallet files
//! and ballot entry live in the client, not here.

#[allow(clippy::module_inception)]
pub mod wallet;

pub use wallet::{hash_pub_key, Wallet};
