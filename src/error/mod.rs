//! Error handling for the voting chain
//!
//! This module provides the error types shared by all chain operations.

use std::fmt;

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Error types for chain operations
///
/// Block rejections are deliberately not represented here: a bad block from
/// a peer is reported as `Ok(false)` by admission so that peers cannot crash
/// the node. Database and decode failures are fatal because the store
/// invariants cannot be restored at runtime.
#[derive(Debug, Clone)]
pub enum ChainError {
    /// The chain already holds a genesis block
    AlreadyInitialized,
    /// A block or transaction is absent from the chain
    NotFound(String),
    /// Database-related errors
    Database(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Transaction construction or signing errors
    Transaction(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::AlreadyInitialized => {
                write!(f, "blockchain has already been initialized")
            }
            ChainError::NotFound(what) => write!(f, "not found: {what}"),
            ChainError::Database(msg) => write!(f, "Database error: {msg}"),
            ChainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            ChainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            ChainError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            ChainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            ChainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<sled::Error> for ChainError {
    fn from(err: sled::Error) -> Self {
        ChainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for ChainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for ChainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        ChainError::Serialization(err.to_string())
    }
}
