//! Utility functions and helpers
//!
//! This module contains cryptographic utilities and the serialization
//! helpers used throughout the chain.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    ecdsa_p256_public_key, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, ripemd160_digest, sha256_digest,
};

pub use serialization::{deserialize, serialize};
